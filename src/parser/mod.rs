pub mod forms;
pub mod ids;
pub mod labels;
pub mod text;
