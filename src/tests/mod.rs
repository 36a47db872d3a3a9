mod config_test;
mod degenerate_test;
mod loopy_test;
mod utils;
