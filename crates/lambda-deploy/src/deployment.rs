use common::lambda::{
    DeploymentResult, FunctionCodeProvider, ProviderError, UpdateCodeRequest, DEFAULT_PROFILE,
    DEFAULT_REGION,
};
use derive_more::{Display, Error, From};
use tracing::info;

/// Deployment client errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum DeploymentError {
    /// Function identifier is empty.
    #[display(fmt = "a function identifier is required to upload the code package")]
    MissingIdentifier,

    /// Code package is empty.
    #[display(fmt = "a non-empty code package is required to update the function")]
    MissingPayload,

    /// Cloud provider rejected the request or couldn't be reached.
    #[display(fmt = "unable to update function code: {}", _0)]
    Provider(#[error(not(source))] ProviderError),
}

/// Replace the code package of a remote function.
///
/// Inputs are validated before the provider is contacted. Absent profile and region
/// fall back to [`DEFAULT_PROFILE`] and [`DEFAULT_REGION`]. The provider response
/// is returned as is, and failures are not retried.
pub(crate) async fn upload<P: FunctionCodeProvider>(
    provider: &P,
    function_identifier: &str,
    payload: Vec<u8>,
    profile: Option<&str>,
    region: Option<&str>,
) -> Result<DeploymentResult, DeploymentError> {
    if function_identifier.is_empty() {
        return Err(DeploymentError::MissingIdentifier);
    }

    if payload.is_empty() {
        return Err(DeploymentError::MissingPayload);
    }

    let request = UpdateCodeRequest {
        function_identifier: function_identifier.to_owned(),
        payload,
        profile: profile
            .filter(|val| !val.is_empty())
            .unwrap_or(DEFAULT_PROFILE)
            .to_owned(),
        region: region
            .filter(|val| !val.is_empty())
            .unwrap_or(DEFAULT_REGION)
            .to_owned(),
    };

    info!(
        function = %request.function_identifier,
        profile = %request.profile,
        region = %request.region,
        bytes = request.payload.len(),
        "updating function code"
    );

    Ok(provider.update_function_code(request).await?)
}
