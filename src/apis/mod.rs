pub mod base;
pub mod factory;
pub mod survey_monkey;
pub mod typeform;

pub use base::ProviderSettings;
pub use factory::create_providers;
pub use survey_monkey::SurveyMonkeyAdapter;
pub use typeform::TypeformAdapter;
