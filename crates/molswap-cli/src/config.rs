use crate::cli::ReplaceArgs;
use crate::error::{CliError, Result};
use crate::utils::parser;
use molswap::core::models::snapshot::ReferencePoint;
use molswap::engine::config::{self as core_config, SpatialWindow};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

const DEFAULT_INPUT: &str = "out.gro";
const DEFAULT_OUTPUT: &str = "conf.gro";
const DEFAULT_TOPOLOGY: &str = "topol.top";
const DEFAULT_INDEX: &str = "index.ndx";
const DEFAULT_GROUP: &str = "SOL";
const DEFAULT_MOLECULE: &str = "He";

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialFilesConfig {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    topology: Option<PathBuf>,
    index: Option<PathBuf>,
    report: Option<PathBuf>,
    molecules_out: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialSelectionConfig {
    group: Option<String>,
    molecule: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialSamplingConfig {
    count: Option<usize>,
    max_attempts: Option<u64>,
    reference: Option<String>,
    seed: Option<u64>,
    strict: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialWindowConfig {
    axis: Option<String>,
    lower: Option<f64>,
    upper: Option<f64>,
}

/// The `replace` settings of a TOML config file, every field optional.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct PartialReplaceConfig {
    files: Option<PartialFilesConfig>,
    selection: Option<PartialSelectionConfig>,
    sampling: Option<PartialSamplingConfig>,
    window: Option<PartialWindowConfig>,
}

/// Everything the `replace` command needs once CLI, `--set` values, the config
/// file and defaults have been merged.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedReplace {
    pub core: core_config::ReplaceConfig,
    pub output: PathBuf,
    pub description: String,
    pub report: Option<PathBuf>,
    pub molecules_out: Option<PathBuf>,
}

impl PartialReplaceConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Merges CLI arguments over this file configuration.
    ///
    /// Precedence is CLI flag, then `--set` value, then config file, then the
    /// built-in default.
    pub fn merge_with_cli(mut self, args: &ReplaceArgs) -> Result<ResolvedReplace> {
        self.apply_set_values(&args.set_values)?;

        let files = self.files.take().unwrap_or_default();
        let selection = self.selection.take().unwrap_or_default();
        let sampling = self.sampling.take().unwrap_or_default();
        let window_config = self.window.take().unwrap_or_default();

        let path_or = |cli: &Option<PathBuf>, file: Option<PathBuf>, default: &str| -> PathBuf {
            cli.clone().or(file).unwrap_or_else(|| PathBuf::from(default))
        };

        let window = Self::merge_window(args.window.as_deref(), window_config)?;

        let reference = match (args.reference, sampling.reference.as_deref()) {
            (Some(cli), _) => cli.into(),
            (None, Some(name)) => {
                parser::parse_reference(name).map_err(|e| CliError::Config(e.to_string()))?
            }
            (None, None) => ReferencePoint::default(),
        };

        let core = core_config::ReplaceConfigBuilder::new()
            .coordinates_path(path_or(&args.input, files.input, DEFAULT_INPUT))
            .topology_path(path_or(&args.topology, files.topology, DEFAULT_TOPOLOGY))
            .index_path(path_or(&args.index, files.index, DEFAULT_INDEX))
            .group(
                args.group
                    .clone()
                    .or(selection.group)
                    .unwrap_or_else(|| DEFAULT_GROUP.to_string()),
            )
            .molecule(
                args.molecule
                    .clone()
                    .or(selection.molecule)
                    .unwrap_or_else(|| DEFAULT_MOLECULE.to_string()),
            )
            .count(args.count.or(sampling.count).unwrap_or(0))
            .max_attempts(
                args.max_attempts
                    .or(sampling.max_attempts)
                    .unwrap_or(core_config::DEFAULT_MAX_ATTEMPTS),
            )
            .reference(reference)
            .seed(args.seed.or(sampling.seed))
            .window(window)
            .strict(Self::merge_strict(args, sampling.strict))
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        Ok(ResolvedReplace {
            core,
            output: path_or(&args.output, files.output, DEFAULT_OUTPUT),
            description: args
                .description
                .clone()
                .or(selection.description)
                .unwrap_or_default(),
            report: args.report.clone().or(files.report),
            molecules_out: args.molecules_out.clone().or(files.molecules_out),
        })
    }

    fn merge_strict(args: &ReplaceArgs, file_val: Option<bool>) -> bool {
        if args.strict {
            true
        } else if args.no_strict {
            false
        } else {
            file_val.unwrap_or(false)
        }
    }

    fn merge_window(cli: Option<&str>, file: PartialWindowConfig) -> Result<SpatialWindow> {
        if let Some(spec) = cli {
            return parser::parse_window(spec).map_err(|e| CliError::Argument(e.to_string()));
        }

        let defaults = SpatialWindow::default();
        let axis = match file.axis.as_deref() {
            Some(name) => parser::parse_axis(name).map_err(|e| CliError::Config(e.to_string()))?,
            None => defaults.axis,
        };
        let window = SpatialWindow::new(
            axis,
            file.lower.unwrap_or(defaults.lower),
            file.upper.unwrap_or(defaults.upper),
        );
        if !window.is_valid() {
            return Err(CliError::Config(format!(
                "`window` needs finite bounds with lower < upper, got ({}, {}).",
                window.lower, window.upper
            )));
        }
        Ok(window)
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };

            match key {
                "files.input" => self.files_mut().input = Some(value.into()),
                "files.output" => self.files_mut().output = Some(value.into()),
                "files.topology" => self.files_mut().topology = Some(value.into()),
                "files.index" => self.files_mut().index = Some(value.into()),
                "files.report" => self.files_mut().report = Some(value.into()),
                "files.molecules-out" => self.files_mut().molecules_out = Some(value.into()),
                "selection.group" => self.selection_mut().group = Some(value.to_string()),
                "selection.molecule" => self.selection_mut().molecule = Some(value.to_string()),
                "selection.description" => {
                    self.selection_mut().description = Some(value.to_string())
                }
                "sampling.count" => self.sampling_mut().count = Some(parse_value(key, value)?),
                "sampling.max-attempts" => {
                    self.sampling_mut().max_attempts = Some(parse_value(key, value)?)
                }
                "sampling.reference" => self.sampling_mut().reference = Some(value.to_string()),
                "sampling.seed" => self.sampling_mut().seed = Some(parse_value(key, value)?),
                "sampling.strict" => self.sampling_mut().strict = Some(parse_value(key, value)?),
                "window.axis" => self.window_mut().axis = Some(value.to_string()),
                "window.lower" => self.window_mut().lower = Some(parse_value(key, value)?),
                "window.upper" => self.window_mut().upper = Some(parse_value(key, value)?),
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }

    fn files_mut(&mut self) -> &mut PartialFilesConfig {
        self.files.get_or_insert_with(Default::default)
    }
    fn selection_mut(&mut self) -> &mut PartialSelectionConfig {
        self.selection.get_or_insert_with(Default::default)
    }
    fn sampling_mut(&mut self) -> &mut PartialSamplingConfig {
        self.sampling.get_or_insert_with(Default::default)
    }
    fn window_mut(&mut self) -> &mut PartialWindowConfig {
        self.window.get_or_insert_with(Default::default)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        CliError::Config(format!(
            "Invalid {} value for {}: {}",
            std::any::type_name::<T>(),
            key,
            value
        ))
    })
}
