mod histogram;

pub use histogram::{histogram, plot_terminal_distribution};
