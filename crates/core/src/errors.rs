use thiserror::Error;

use crate::session::SessionState;

/// Quote-time failures.
///
/// `user_message` carries the Spanish text shown on the interaction surface
/// for the conditions a user can fix themselves; the `Display` impl stays in
/// English for logs and operator tooling.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown category `{category}`")]
    UnknownCategory { category: String },
    #[error("unknown line item `{concept}` in category `{category}`")]
    UnknownLineItem { category: String, concept: String },
    #[error("category `{category}` has no positive quantities")]
    EmptyContribution { category: String },
    #[error("client information is incomplete: missing {}", missing.join(", "))]
    MissingClientInfo { missing: Vec<String> },
    #[error("invalid session action `{action}` from state {state:?}")]
    InvalidSessionTransition { state: SessionState, action: String },
}

impl DomainError {
    /// Conditions the user can resolve by correcting their input.
    ///
    /// `UnknownCategory`/`UnknownLineItem` are deliberately excluded: the
    /// interaction surface only ever offers catalog entries, so hitting one
    /// of those is a defect to report, not something to ask the user about.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            Self::EmptyContribution { .. }
                | Self::MissingClientInfo { .. }
                | Self::InvalidSessionTransition { .. }
        )
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyContribution { category } => format!(
                "Introduce al menos una cantidad mayor que cero en `{category}` antes de añadirla al presupuesto."
            ),
            Self::MissingClientInfo { missing } => format!(
                "Por favor completa todos los campos del cliente antes de continuar. Faltan: {}.",
                missing.iter().map(|field| spanish_field_label(field)).collect::<Vec<_>>().join(", ")
            ),
            Self::InvalidSessionTransition { .. } => {
                "Añade al menos una categoría al presupuesto antes de generar el documento."
                    .to_string()
            }
            Self::UnknownCategory { .. } | Self::UnknownLineItem { .. } => {
                "Se ha producido un error inesperado. Vuelve a cargar la página e inténtalo de nuevo."
                    .to_string()
            }
        }
    }
}

fn spanish_field_label(field: &str) -> &str {
    match field {
        "name" => "nombre",
        "email" => "email",
        "phone" => "teléfono",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::DomainError;
    use crate::session::SessionState;

    #[test]
    fn empty_contribution_is_user_correctable() {
        let error = DomainError::EmptyContribution { category: "Pintura".to_string() };
        assert!(error.is_user_correctable());
        assert!(error.user_message().contains("Pintura"));
        assert!(error.user_message().contains("cantidad mayor que cero"));
    }

    #[test]
    fn missing_client_info_lists_spanish_field_labels() {
        let error = DomainError::MissingClientInfo {
            missing: vec!["name".to_string(), "phone".to_string()],
        };
        assert!(error.is_user_correctable());
        assert!(error.user_message().contains("nombre, teléfono"));
    }

    #[test]
    fn unknown_lookups_are_defects_not_user_errors() {
        let unknown_category = DomainError::UnknownCategory { category: "Domótica".to_string() };
        assert!(!unknown_category.is_user_correctable());

        let unknown_item = DomainError::UnknownLineItem {
            category: "Pintura".to_string(),
            concept: "Mural".to_string(),
        };
        assert!(!unknown_item.is_user_correctable());
        assert_eq!(unknown_item.to_string(), "unknown line item `Mural` in category `Pintura`");
    }

    #[test]
    fn finalizing_an_empty_session_asks_for_a_category() {
        let error = DomainError::InvalidSessionTransition {
            state: SessionState::Empty,
            action: "finalize".to_string(),
        };
        assert!(error.is_user_correctable());
        assert!(error.user_message().contains("al menos una categoría"));
    }
}
