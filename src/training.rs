pub mod checkpoint;
pub mod curriculum;
pub mod maxcut;
