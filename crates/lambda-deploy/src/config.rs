use std::{
    collections::BTreeSet,
    env,
    ffi::OsStr,
    fs, io,
    path::{Path, PathBuf},
};

use derive_more::{Display, Error};
use serde::Deserialize;

/// Projects file name, looked up next to the executable by default.
pub(crate) const CONFIG_FILE_NAME: &str = "config.json";

/// Default projects file location: [`CONFIG_FILE_NAME`] in the executable's directory.
pub(crate) fn default_config_path() -> io::Result<PathBuf> {
    let executable = env::current_exe()?;

    Ok(executable
        .parent()
        .unwrap_or(Path::new(""))
        .join(CONFIG_FILE_NAME))
}

/// Projects configuration errors.
#[derive(Debug, Display, Error)]
pub(crate) enum ProjectConfigError {
    /// Projects file doesn't exist or isn't a regular file.
    #[display(fmt = "config file {} was not found", path)]
    NotFound {
        /// Expected config file location.
        path: String,
    },

    /// Projects file exists, but can't be read.
    #[display(fmt = "unable to read config file {}: {}", path, source)]
    Read {
        /// Config file location.
        path: String,

        /// Underlying IO error.
        #[error(not(source))]
        source: io::Error,
    },

    /// Projects file isn't valid JSON or has values of unexpected types.
    #[display(fmt = "malformed configuration: {}", _0)]
    Json(#[error(not(source))] serde_json::Error),

    /// Required key or section is absent.
    #[display(fmt = "malformed configuration: missing the `{}` section", field)]
    MissingField {
        /// Full path of the missing key.
        field: String,
    },

    /// Required value is present, but empty.
    #[display(fmt = "malformed configuration: `{}` must not be empty", field)]
    EmptyField {
        /// Full path of the empty key.
        field: String,
    },

    /// Archive name contains directory components.
    #[display(
        fmt = "malformed configuration: `{}` must be a bare file name, got {:?}",
        field,
        value
    )]
    InvalidFileName {
        /// Full path of the offending key.
        field: String,

        /// Provided value.
        value: String,
    },

    /// Project name wasn't provided.
    #[display(fmt = "a project name needs to be provided")]
    EmptyProjectName,

    /// No entry matches the requested project name.
    #[display(fmt = "unable to find project {:?} in the config file", name)]
    ProjectNotFound {
        /// Requested project name.
        name: String,
    },

    /// More than one entry matches the requested project name.
    #[display(fmt = "project name {:?} matches {} entries in the config file", name, count)]
    AmbiguousProject {
        /// Requested project name.
        name: String,

        /// Number of matching entries.
        count: usize,
    },
}

/// Archive packaging parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ArchiveSpec {
    /// Directory whose files are packaged.
    pub source_directory: PathBuf,

    /// Archive file name, without directory components.
    pub file_name: String,

    /// File base names excluded from the archive.
    pub ignore_files: BTreeSet<String>,
}

/// Deployment target parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DeploySpec {
    /// Remote function identifier, usually an ARN.
    pub function_identifier: String,

    /// Credential profile, provider default when absent.
    pub profile: Option<String>,

    /// Region, fallback region when absent.
    pub region: Option<String>,
}

/// A single deployable project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProjectConfig {
    /// Project name, as written in the config file.
    pub name: String,

    /// Packaging parameters.
    pub archive: ArchiveSpec,

    /// Deployment parameters.
    pub deploy: DeploySpec,
}

impl ProjectConfig {
    /// Load the projects file and select a single project by its name.
    pub(crate) fn resolve(
        config_path: &Path,
        project_name: &str,
    ) -> Result<Self, ProjectConfigError> {
        if project_name.is_empty() {
            return Err(ProjectConfigError::EmptyProjectName);
        }

        ProjectsDocument::load(config_path)?.select(project_name)
    }
}

/// Validated contents of a projects file.
pub(crate) struct ProjectsDocument {
    /// All configured projects, in file order.
    projects: Vec<ProjectConfig>,
}

impl ProjectsDocument {
    /// Read and validate the projects file at `path`.
    ///
    /// Relative source directories are resolved against the directory that holds the file.
    pub(crate) fn load(path: &Path) -> Result<Self, ProjectConfigError> {
        if !path.is_file() {
            return Err(ProjectConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        let text = fs::read_to_string(path).map_err(|source| ProjectConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::parse(&text, path.parent().unwrap_or(Path::new("")))
    }

    /// Parse and validate a projects document.
    ///
    /// Every entry is validated, not only the one that gets selected later.
    pub(crate) fn parse(text: &str, base_dir: &Path) -> Result<Self, ProjectConfigError> {
        let document: RawDocument = serde_json::from_str(text).map_err(ProjectConfigError::Json)?;

        let projects = required(document.projects, || String::from("Projects"))?
            .into_iter()
            .enumerate()
            .map(|(index, entry)| entry.validate(index, base_dir))
            .collect::<Result<_, _>>()?;

        Ok(Self { projects })
    }

    /// Select a project by its case-insensitive name.
    pub(crate) fn select(self, project_name: &str) -> Result<ProjectConfig, ProjectConfigError> {
        if project_name.is_empty() {
            return Err(ProjectConfigError::EmptyProjectName);
        }

        let needle = project_name.to_lowercase();

        let mut matches: Vec<_> = self
            .projects
            .into_iter()
            .filter(|project| project.name.to_lowercase() == needle)
            .collect();

        match matches.len() {
            0 => Err(ProjectConfigError::ProjectNotFound {
                name: project_name.to_owned(),
            }),
            1 => Ok(matches.remove(0)),
            count => Err(ProjectConfigError::AmbiguousProject {
                name: project_name.to_owned(),
                count,
            }),
        }
    }
}

/// Top-level JSON document.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawDocument {
    /// Project entries.
    projects: Option<Vec<RawEntry>>,
}

/// Single element of the `Projects` array.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawEntry {
    /// Project description.
    project_info: Option<RawProjectInfo>,
}

/// `ProjectInfo` section.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawProjectInfo {
    /// Project name.
    project_name: Option<String>,

    /// Packaging section.
    zip_info: Option<RawZipInfo>,

    /// Deployment section.
    lambda_info: Option<RawLambdaInfo>,
}

/// `ZipInfo` section.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawZipInfo {
    /// Source directory.
    source_directory: Option<String>,

    /// Archive file name.
    file_name: Option<String>,

    /// Ignored file names.
    ignore_files: Option<Vec<String>>,
}

/// `LambdaInfo` section.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawLambdaInfo {
    /// Function identifier.
    #[serde(rename = "ARN")]
    arn: Option<String>,

    /// Credential profile.
    profile_name: Option<String>,

    /// Region.
    region_name: Option<String>,
}

impl RawEntry {
    /// Turn a loosely-typed entry into a [`ProjectConfig`].
    fn validate(self, index: usize, base_dir: &Path) -> Result<ProjectConfig, ProjectConfigError> {
        let section = format!("Projects[{index}].ProjectInfo");

        let info = required(self.project_info, || section.clone())?;

        let name = required_str(info.project_name, || format!("{section}.ProjectName"))?;

        let zip_info = required(info.zip_info, || format!("{section}.ZipInfo"))?;

        let source_directory = required_str(zip_info.source_directory, || {
            format!("{section}.ZipInfo.SourceDirectory")
        })?;

        let file_name = required_str(zip_info.file_name, || format!("{section}.ZipInfo.FileName"))?;

        if Path::new(&file_name).file_name() != Some(OsStr::new(&file_name)) {
            return Err(ProjectConfigError::InvalidFileName {
                field: format!("{section}.ZipInfo.FileName"),
                value: file_name,
            });
        }

        let lambda_info = required(info.lambda_info, || format!("{section}.LambdaInfo"))?;

        let function_identifier =
            required_str(lambda_info.arn, || format!("{section}.LambdaInfo.ARN"))?;

        Ok(ProjectConfig {
            name,
            archive: ArchiveSpec {
                source_directory: base_dir.join(source_directory),
                file_name,
                ignore_files: zip_info.ignore_files.unwrap_or_default().into_iter().collect(),
            },
            deploy: DeploySpec {
                function_identifier,
                profile: lambda_info.profile_name.filter(|val| !val.is_empty()),
                region: lambda_info.region_name.filter(|val| !val.is_empty()),
            },
        })
    }
}

/// Unwrap a required value, reporting `field` when it is absent.
fn required<T>(value: Option<T>, field: impl FnOnce() -> String) -> Result<T, ProjectConfigError> {
    value.ok_or_else(|| ProjectConfigError::MissingField { field: field() })
}

/// Unwrap a required non-empty string.
fn required_str(
    value: Option<String>,
    field: impl FnOnce() -> String,
) -> Result<String, ProjectConfigError> {
    match value {
        None => Err(ProjectConfigError::MissingField { field: field() }),
        Some(val) if val.is_empty() => Err(ProjectConfigError::EmptyField { field: field() }),
        Some(val) => Ok(val),
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        path::{Path, PathBuf},
    };

    use serde_json::{json, Value};

    use super::{default_config_path, ProjectConfig, ProjectConfigError, ProjectsDocument};

    fn demo_config() -> Value {
        json!({
            "Projects": [
                {
                    "ProjectInfo": {
                        "ProjectName": "Demo",
                        "ZipInfo": {
                            "SourceDirectory": "./src",
                            "FileName": "demo.zip"
                        },
                        "LambdaInfo": {
                            "ARN": "arn:aws:lambda:us-east-1:123:function:demo"
                        }
                    }
                },
                {
                    "ProjectInfo": {
                        "ProjectName": "worker",
                        "ZipInfo": {
                            "SourceDirectory": "/opt/worker",
                            "FileName": "worker.zip",
                            "IgnoreFiles": ["config.json", ".env"]
                        },
                        "LambdaInfo": {
                            "ARN": "arn:aws:lambda:eu-west-1:123:function:worker",
                            "ProfileName": "deploy",
                            "RegionName": "eu-west-1"
                        }
                    }
                }
            ]
        })
    }

    fn parse(value: &Value) -> Result<ProjectsDocument, ProjectConfigError> {
        ProjectsDocument::parse(&value.to_string(), Path::new("/configs"))
    }

    fn select(value: &Value, name: &str) -> Result<ProjectConfig, ProjectConfigError> {
        parse(value)?.select(name)
    }

    fn without(mut value: Value, section: &str, key: &str) -> Value {
        value
            .pointer_mut(section)
            .and_then(Value::as_object_mut)
            .expect("section should exist")
            .remove(key)
            .expect("key should exist");
        value
    }

    #[test]
    fn name_matches_case_insensitively() {
        let config = demo_config();

        let lower = select(&config, "demo").expect("unable to resolve project");
        let upper = select(&config, "DEMO").expect("unable to resolve project");
        let mixed = select(&config, "Demo").expect("unable to resolve project");

        assert_eq!(lower, upper);
        assert_eq!(lower, mixed);
        assert_eq!(lower.name, "Demo");
    }

    #[test]
    fn optional_fields_default() {
        let project = select(&demo_config(), "demo").expect("unable to resolve project");

        assert!(project.archive.ignore_files.is_empty());
        assert_eq!(project.deploy.profile, None);
        assert_eq!(project.deploy.region, None);
        assert_eq!(
            project.deploy.function_identifier,
            "arn:aws:lambda:us-east-1:123:function:demo"
        );
    }

    #[test]
    fn optional_fields_are_read() {
        let project = select(&demo_config(), "Worker").expect("unable to resolve project");

        assert_eq!(
            project.archive.ignore_files.into_iter().collect::<Vec<_>>(),
            vec![".env", "config.json"]
        );
        assert_eq!(project.archive.source_directory, PathBuf::from("/opt/worker"));
        assert_eq!(project.deploy.profile.as_deref(), Some("deploy"));
        assert_eq!(project.deploy.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn empty_optional_values_are_absent() {
        let mut config = demo_config();
        config["Projects"][1]["ProjectInfo"]["LambdaInfo"]["ProfileName"] = json!("");
        config["Projects"][1]["ProjectInfo"]["LambdaInfo"]["RegionName"] = json!("");

        let project = select(&config, "worker").expect("unable to resolve project");

        assert_eq!(project.deploy.profile, None);
        assert_eq!(project.deploy.region, None);
    }

    #[test]
    fn relative_source_directory_uses_config_location() {
        let project = select(&demo_config(), "demo").expect("unable to resolve project");

        assert_eq!(
            project.archive.source_directory,
            Path::new("/configs").join("./src")
        );
    }

    #[test]
    fn absent_project_is_not_found() {
        let result = select(&demo_config(), "missing");

        assert!(matches!(
            result,
            Err(ProjectConfigError::ProjectNotFound { name }) if name == "missing"
        ));
    }

    #[test]
    fn empty_project_name_is_rejected() {
        assert!(matches!(
            select(&demo_config(), ""),
            Err(ProjectConfigError::EmptyProjectName)
        ));
    }

    #[test]
    fn duplicate_names_are_ambiguous() {
        let mut config = demo_config();
        config["Projects"][1]["ProjectInfo"]["ProjectName"] = json!("DEMO");

        assert!(matches!(
            select(&config, "demo"),
            Err(ProjectConfigError::AmbiguousProject { count: 2, .. })
        ));
    }

    #[test]
    fn missing_required_fields_are_named() {
        let cases = [
            ("", "Projects", "Projects"),
            ("/Projects/0", "ProjectInfo", "Projects[0].ProjectInfo"),
            (
                "/Projects/0/ProjectInfo",
                "ProjectName",
                "Projects[0].ProjectInfo.ProjectName",
            ),
            (
                "/Projects/0/ProjectInfo",
                "ZipInfo",
                "Projects[0].ProjectInfo.ZipInfo",
            ),
            (
                "/Projects/0/ProjectInfo/ZipInfo",
                "SourceDirectory",
                "Projects[0].ProjectInfo.ZipInfo.SourceDirectory",
            ),
            (
                "/Projects/0/ProjectInfo/ZipInfo",
                "FileName",
                "Projects[0].ProjectInfo.ZipInfo.FileName",
            ),
            (
                "/Projects/1/ProjectInfo",
                "LambdaInfo",
                "Projects[1].ProjectInfo.LambdaInfo",
            ),
            (
                "/Projects/1/ProjectInfo/LambdaInfo",
                "ARN",
                "Projects[1].ProjectInfo.LambdaInfo.ARN",
            ),
        ];

        for (section, key, expected) in cases {
            let config = without(demo_config(), section, key);

            match parse(&config) {
                Err(ProjectConfigError::MissingField { field }) => assert_eq!(field, expected),
                Err(error) => panic!("unexpected error for {key}: {error}"),
                Ok(_) => panic!("missing {key} should be rejected"),
            }
        }
    }

    #[test]
    fn empty_required_field_is_rejected() {
        let mut config = demo_config();
        config["Projects"][0]["ProjectInfo"]["LambdaInfo"]["ARN"] = json!("");

        let error = parse(&config).err().expect("empty ARN should be rejected");

        assert!(matches!(&error, ProjectConfigError::EmptyField { field }
            if field == "Projects[0].ProjectInfo.LambdaInfo.ARN"));
        assert!(error.to_string().contains("LambdaInfo.ARN"));
    }

    #[test]
    fn nested_archive_name_is_rejected() {
        for name in ["out/demo.zip", "..", "."] {
            let mut config = demo_config();
            config["Projects"][0]["ProjectInfo"]["ZipInfo"]["FileName"] = json!(name);

            assert!(
                matches!(parse(&config), Err(ProjectConfigError::InvalidFileName { .. })),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn wrong_value_type_is_malformed() {
        let mut config = demo_config();
        config["Projects"][0]["ProjectInfo"]["ZipInfo"]["IgnoreFiles"] = json!("handler.py");

        assert!(matches!(parse(&config), Err(ProjectConfigError::Json(_))));
    }

    #[test]
    fn resolve_reads_file() {
        let dir = tempfile::tempdir().expect("unable to create temp dir");
        let path = dir.path().join("config.json");
        fs::write(&path, demo_config().to_string()).expect("unable to write config");

        let project = ProjectConfig::resolve(&path, "DEMO").expect("unable to resolve project");

        assert_eq!(project.archive.source_directory, dir.path().join("./src"));
        assert_eq!(project.archive.file_name, "demo.zip");
    }

    #[test]
    fn resolve_reports_missing_file() {
        let dir = tempfile::tempdir().expect("unable to create temp dir");

        assert!(matches!(
            ProjectConfig::resolve(&dir.path().join("config.json"), "demo"),
            Err(ProjectConfigError::NotFound { .. })
        ));
    }

    #[test]
    fn resolve_reports_invalid_json() {
        let dir = tempfile::tempdir().expect("unable to create temp dir");
        let path = dir.path().join("config.json");
        fs::write(&path, "{\"Projects\": [").expect("unable to write config");

        let error = ProjectConfig::resolve(&path, "demo").err().expect("should fail");

        assert!(matches!(error, ProjectConfigError::Json(_)));
        assert!(error.to_string().starts_with("malformed configuration"));
    }

    #[test]
    fn default_config_sits_next_to_executable() {
        let path = default_config_path().expect("unable to locate executable");
        let executable = std::env::current_exe().unwrap();

        assert_eq!(path.file_name().unwrap(), "config.json");
        assert_eq!(path.parent(), executable.parent());
    }
}
