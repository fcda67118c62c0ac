pub mod coding;
