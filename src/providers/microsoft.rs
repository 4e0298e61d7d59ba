use crate::providers::strategies::{LocatorStrategies, MICROSOFT_FORMS};
use crate::providers::{FormProvider, ProviderKind};

/// Microsoft Forms：容器为 `form`，没有时退回 `body`
pub struct MicrosoftFormsProvider;

impl FormProvider for MicrosoftFormsProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Microsoft
    }

    fn strategies(&self) -> &'static LocatorStrategies {
        &MICROSOFT_FORMS
    }
}
