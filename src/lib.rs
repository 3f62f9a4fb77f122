pub mod codegen;
pub mod ir;
pub mod output;
pub mod target;
