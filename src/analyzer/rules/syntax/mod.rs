pub mod named_arguments;

pub use named_arguments::NamedArgumentsRule;
