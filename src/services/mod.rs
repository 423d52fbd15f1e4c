pub mod evaluations;
pub mod periods;
pub mod reminders;
pub mod settings;
pub mod users;
