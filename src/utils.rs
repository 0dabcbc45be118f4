pub mod complex;
pub mod stop;
