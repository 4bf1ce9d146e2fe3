pub mod array;
pub mod heap;
