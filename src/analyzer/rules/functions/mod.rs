pub mod new_functions;
pub mod removed_functions;

pub use new_functions::{NewFunctions, NewFunctionsRule};
pub use removed_functions::{RemovedFunctions, RemovedFunctionsRule};
