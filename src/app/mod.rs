pub mod choices_service;
pub mod registry_service;
pub mod scan_service;
pub mod tree_service;
