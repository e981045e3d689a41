pub mod default_components;
