use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("{0}")]
    Invalid(String),
    #[error("recipe service unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),
    #[error("recipe service rejected the request: {0}")]
    Rejected(StatusCode),
    #[error("recipe not found: {0}")]
    NotFound(u64),
    #[error("recipe service sent a malformed response: {0}")]
    Malformed(#[source] reqwest::Error),
    #[error("missing API key: set SPOONACULAR_API_KEY or pass --api-key")]
    MissingApiKey,
    #[error("could not render page: {0}")]
    Render(#[from] askama::Error),
}

impl RecipeError {
    /// Status for an HTML page reporting this error.
    pub fn status(&self) -> StatusCode {
        match self {
            RecipeError::Invalid(_) => StatusCode::BAD_REQUEST,
            RecipeError::NotFound(_) => StatusCode::NOT_FOUND,
            RecipeError::Unreachable(_) | RecipeError::Rejected(_) | RecipeError::Malformed(_) => {
                StatusCode::BAD_GATEWAY
            }
            RecipeError::MissingApiKey | RecipeError::Render(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to the user in place of the recipe data.
    pub fn user_message(&self) -> String {
        match self {
            RecipeError::Invalid(msg) => msg.clone(),
            RecipeError::NotFound(_) => "That recipe could not be found.".to_string(),
            RecipeError::Unreachable(_) => {
                "The recipe service could not be reached. Please try again later.".to_string()
            }
            RecipeError::Rejected(status) => {
                format!("The recipe service returned an error ({}).", status.as_u16())
            }
            RecipeError::Malformed(_) => {
                "The recipe service sent a response we could not read.".to_string()
            }
            _ => "Something went wrong on our side.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_is_a_client_error() {
        let e = RecipeError::Invalid("Please enter at least one ingredient.".to_string());
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.user_message(), "Please enter at least one ingredient.");
    }

    #[test]
    fn upstream_errors_are_gateway_errors() {
        assert_eq!(
            RecipeError::Rejected(StatusCode::PAYMENT_REQUIRED).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(RecipeError::NotFound(7).status(), StatusCode::NOT_FOUND);
        assert!(RecipeError::Rejected(StatusCode::PAYMENT_REQUIRED)
            .user_message()
            .contains("402"));
    }
}
