//! Master-data forms built on the stepped form engine.

pub mod catalyst;
pub mod common;
pub mod inspection;
pub mod part;
pub mod production;
pub mod sequence;
pub mod template;

use std::fmt;
use std::str::FromStr;

use crate::errors::FormError;
use crate::form::FormModel;

pub use catalyst::CatalystChartForm;
pub use inspection::InspectionForm;
pub use part::PartForm;
pub use production::ProductionExecutionForm;
pub use sequence::ProcessSequenceForm;
pub use template::PrcTemplateForm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MasterKind {
    Catalyst,
    Inspection,
    Part,
    Sequence,
    Template,
    Production,
}

impl MasterKind {
    pub fn all() -> [MasterKind; 6] {
        [
            MasterKind::Catalyst,
            MasterKind::Inspection,
            MasterKind::Part,
            MasterKind::Sequence,
            MasterKind::Template,
            MasterKind::Production,
        ]
    }

    /// Form identifier, also the storage directory name.
    pub fn name(self) -> &'static str {
        self.model().name()
    }

    pub fn title(self) -> &'static str {
        self.model().title()
    }

    pub fn model(self) -> Box<dyn FormModel> {
        match self {
            MasterKind::Catalyst => Box::new(CatalystChartForm),
            MasterKind::Inspection => Box::new(InspectionForm),
            MasterKind::Part => Box::new(PartForm),
            MasterKind::Sequence => Box::new(ProcessSequenceForm),
            MasterKind::Template => Box::new(PrcTemplateForm),
            MasterKind::Production => Box::new(ProductionExecutionForm),
        }
    }
}

impl fmt::Display for MasterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MasterKind {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        MasterKind::all()
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| FormError::UnknownForm(s.trim().to_string()))
    }
}
