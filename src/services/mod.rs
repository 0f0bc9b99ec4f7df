pub mod account_service;
pub mod account_service_impl;
pub use account_service::{AccountError, AccountService};
pub use account_service_impl::SeaOrmAccountService;

pub mod case_service;
pub mod case_service_impl;
pub use case_service::{CaseError, CaseService};
pub use case_service_impl::SeaOrmCaseService;

pub mod notifier;
pub use notifier::{LogNotifier, Notifier, NotifyError, SmtpNotifier};

pub mod scheduler;
pub use scheduler::Scheduler;
