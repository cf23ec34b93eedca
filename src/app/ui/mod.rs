mod identity;
mod panels;
mod settings;

pub(in crate::app) use identity::choose_identity;
