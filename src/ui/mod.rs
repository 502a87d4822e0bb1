pub mod action_link;
pub mod catalog;
pub mod datepicker;
pub mod delegate;
pub mod event;
pub mod registry;
pub mod runtime;
pub mod schema;
pub mod search;
pub mod selection;
pub mod selector;
pub mod serializer;
