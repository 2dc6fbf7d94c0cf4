pub mod config;
pub mod config_loader;
pub mod domain_utils;
pub mod engine;
pub mod features;
pub mod report;
pub mod rules;
pub mod scoring;
pub mod similarity;

pub use config_loader::RuleRepository;
pub use domain_utils::{DomainInfo, DomainParser};
pub use engine::Engine;
pub use features::email_analyzer::{EmailAnalysis, EmailInput};
pub use features::sms_analyzer::{SmsAnalysis, SmsInput};
pub use features::url_analyzer::UrlAnalysis;
pub use report::{Reportable, ScanOutcome, ScanRecord};
pub use rules::{Channel, RuleBook};
pub use scoring::Verdict;
