pub mod grade;
pub mod show;
pub mod validate;
