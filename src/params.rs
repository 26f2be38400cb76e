//! Module arguments: the JSON object the automation framework passes in.

use ostreekit::{DesiredState, State};
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Key the automation framework may wrap the arguments in
const WRAPPER_KEY: &str = "ANSIBLE_MODULE_ARGS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgsError {
    #[error("parameters are mutually exclusive: name|list")]
    NameAndList,

    #[error("invalid module arguments: {0}")]
    Invalid(String),
}

/// Package names given as one string or a list of strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NameList {
    One(String),
    Many(Vec<String>),
}

impl NameList {
    fn into_vec(self) -> Vec<String> {
        match self {
            NameList::One(name) => vec![name],
            NameList::Many(names) => names,
        }
    }
}

/// Raw module arguments. Unknown keys are ignored.
///
/// Aliases are separate fields so that supplying more than one of them is
/// not a parse error.
#[derive(Debug, Default, Deserialize)]
pub struct ModuleArgs {
    #[serde(default)]
    name: Option<NameList>,
    #[serde(default)]
    pkg: Option<NameList>,
    #[serde(default)]
    names: Option<NameList>,
    #[serde(default)]
    state: Option<State>,
    #[serde(default)]
    list: Option<String>,
    #[serde(default)]
    installroot: Option<PathBuf>,
    #[serde(default)]
    check_mode: bool,
    #[serde(default, rename = "_ansible_check_mode")]
    ansible_check_mode: bool,
}

/// Validated request ready for the core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub desired: DesiredState,
    pub check_mode: bool,
    pub installroot: Option<PathBuf>,
}

impl ModuleArgs {
    /// Parse module arguments from JSON text, unwrapping the framework envelope if present.
    pub fn from_json(content: &str) -> Result<Self, ArgsError> {
        let mut value: serde_json::Value =
            serde_json::from_str(content).map_err(|e| ArgsError::Invalid(e.to_string()))?;
        if let Some(inner) = value.get_mut(WRAPPER_KEY) {
            value = inner.take();
        }
        serde_json::from_value(value).map_err(|e| ArgsError::Invalid(e.to_string()))
    }

    /// Validate and normalize into a request
    pub fn into_request(self) -> Result<Request, ArgsError> {
        let check_mode = self.check_mode || self.ansible_check_mode;
        let names = split_names(
            Self::pick_names(self.name, self.pkg, self.names)
                .map(NameList::into_vec)
                .unwrap_or_default(),
        );
        let list = self.list.filter(|l| !l.trim().is_empty());

        if !names.is_empty() && list.is_some() {
            return Err(ArgsError::NameAndList);
        }

        Ok(Request {
            desired: DesiredState {
                state: self.state.unwrap_or_default(),
                names,
                list,
            },
            check_mode,
            installroot: self.installroot,
        })
    }

    /// First of `name`, `pkg`, `names` that was given.
    fn pick_names(
        name: Option<NameList>,
        pkg: Option<NameList>,
        names: Option<NameList>,
    ) -> Option<NameList> {
        let given = [("name", name), ("pkg", pkg), ("names", names)];
        let mut chosen = None;
        for (key, value) in given {
            let Some(value) = value else { continue };
            if let Some((first, _)) = &chosen {
                log::warn!("both {first} and {key} given; using {first}");
            } else {
                chosen = Some((key, value));
            }
        }
        chosen.map(|(_, value)| value)
    }
}

/// Split comma-separated entries, trimming whitespace and dropping empties.
pub fn split_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .flat_map(|entry| {
            entry
                .as_ref()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}
