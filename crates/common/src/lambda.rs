use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_lambda::{
    config::Region, error::DisplayErrorContext,
    operation::update_function_code::UpdateFunctionCodeOutput, primitives::Blob, Client,
};
use derive_more::{Display, Error};
use serde::Serialize;
use tracing::debug;

/// Credential profile used when a project doesn't name one.
pub const DEFAULT_PROFILE: &str = "default";

/// Region used when a project doesn't name one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Error reported by the cloud provider or its client library.
///
/// Authentication, transport and service-side rejections all end up here.
/// The message carries the full provider error context.
#[derive(Debug, Display, Error)]
#[display(fmt = "{}", message)]
pub struct ProviderError {
    /// Human-readable error description.
    message: String,
}

impl ProviderError {
    /// Create new provider error with the provided message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Fully resolved "update function code" request.
pub struct UpdateCodeRequest {
    /// Remote function identifier, such as an ARN.
    pub function_identifier: String,

    /// Zip archive bytes.
    pub payload: Vec<u8>,

    /// Credential profile name.
    pub profile: String,

    /// Region name.
    pub region: String,
}

/// Function configuration returned after a code update.
///
/// Field names follow the provider's API so the rendered JSON reads the same
/// as the provider's own tooling.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentResult {
    /// Function name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,

    /// Function ARN.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_arn: Option<String>,

    /// Runtime identifier, absent for container images.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,

    /// Execution role ARN.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Entrypoint invoked by the runtime.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,

    /// Size of the deployed code package, in bytes.
    pub code_size: i64,

    /// Function description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Invocation time limit, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i32>,

    /// Memory available to the function, in megabytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_size: Option<i32>,

    /// Last configuration change timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,

    /// Base64-encoded SHA-256 of the code package.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_sha256: Option<String>,

    /// Function version, `$LATEST` for unpublished code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Function lifecycle state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Explanation of the current state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_reason: Option<String>,

    /// Status of the most recent update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update_status: Option<String>,

    /// Explanation of the last update status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update_status_reason: Option<String>,

    /// Revision identifier of the function configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<String>,

    /// Deployment package type, `Zip` or `Image`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_type: Option<String>,

    /// Instruction set architectures the function supports.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub architectures: Vec<String>,
}

impl From<UpdateFunctionCodeOutput> for DeploymentResult {
    fn from(output: UpdateFunctionCodeOutput) -> Self {
        Self {
            function_name: output.function_name().map(str::to_owned),
            function_arn: output.function_arn().map(str::to_owned),
            runtime: output.runtime().map(|val| val.as_str().to_owned()),
            role: output.role().map(str::to_owned),
            handler: output.handler().map(str::to_owned),
            code_size: output.code_size(),
            description: output.description().map(str::to_owned),
            timeout: output.timeout(),
            memory_size: output.memory_size(),
            last_modified: output.last_modified().map(str::to_owned),
            code_sha256: output.code_sha256().map(str::to_owned),
            version: output.version().map(str::to_owned),
            state: output.state().map(|val| val.as_str().to_owned()),
            state_reason: output.state_reason().map(str::to_owned),
            last_update_status: output.last_update_status().map(|val| val.as_str().to_owned()),
            last_update_status_reason: output.last_update_status_reason().map(str::to_owned),
            revision_id: output.revision_id().map(str::to_owned),
            package_type: output.package_type().map(|val| val.as_str().to_owned()),
            architectures: output
                .architectures()
                .iter()
                .map(|val| val.as_str().to_owned())
                .collect(),
        }
    }
}

/// Cloud provider operation that replaces a function's code package.
#[async_trait]
pub trait FunctionCodeProvider {
    /// Replace the code package of the function named in `request`.
    async fn update_function_code(
        &self,
        request: UpdateCodeRequest,
    ) -> Result<DeploymentResult, ProviderError>;
}

/// [`FunctionCodeProvider`] backed by the AWS Lambda SDK.
///
/// Every call loads a fresh session for the requested profile and region,
/// credential resolution is left to [`aws_config`].
#[derive(Default)]
pub struct AwsLambdaProvider;

#[async_trait]
impl FunctionCodeProvider for AwsLambdaProvider {
    async fn update_function_code(
        &self,
        request: UpdateCodeRequest,
    ) -> Result<DeploymentResult, ProviderError> {
        debug!(
            profile = %request.profile,
            region = %request.region,
            "loading provider session"
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .profile_name(&request.profile)
            .region(Region::new(request.region))
            .load()
            .await;

        let output = Client::new(&sdk_config)
            .update_function_code()
            .function_name(request.function_identifier)
            .zip_file(Blob::new(request.payload))
            .send()
            .await
            .map_err(|error| ProviderError::new(DisplayErrorContext(&error).to_string()))?;

        Ok(output.into())
    }
}
