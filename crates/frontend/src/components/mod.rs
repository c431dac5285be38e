pub mod filter_bar;
pub mod helper_list;
pub mod notices;
