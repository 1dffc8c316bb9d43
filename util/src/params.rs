//! Generic parameters functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use conquer_once::OnceCell;
use serde::de::DeserializeOwned;
use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};
use thiserror::Error;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

/// Parameter directory override, set from the command line.
static PARAMS_DIR: OnceCell<PathBuf> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(
        "No parameter directory was given and the software root environment variable ({0}) \
        is not set"
    )]
    SwRootNotSet(&'static str),

    #[error("The parameter directory has already been set")]
    DirAlreadySet,

    #[error("Cannot load the parameter file {0:?}: {1}")]
    FileLoadError(PathBuf, std::io::Error),

    #[error("Cannot read the parameter file: {0}")]
    DeserialiseError(toml::de::Error),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Set the directory parameter files are loaded from.
///
/// Must be called before the first call to [`load`], and at most once. If it is never called
/// files are loaded from `$ARM_SERVO_SW_ROOT/params`.
pub fn set_dir<P: AsRef<Path>>(dir: P) -> Result<(), LoadError> {
    PARAMS_DIR
        .try_init_once(|| dir.as_ref().to_path_buf())
        .map_err(|_| LoadError::DirAlreadySet)
}

/// Get the directory parameter files are loaded from.
pub fn dir() -> Result<PathBuf, LoadError> {
    if let Some(d) = PARAMS_DIR.get() {
        return Ok(d.clone());
    }

    let mut path = crate::host::get_sw_root()
        .map_err(|_| LoadError::SwRootNotSet(crate::host::SW_ROOT_ENV_VAR))?;
    path.push("params");

    Ok(path)
}

/// Load a parameter file
///
/// The file path is relative to the parameter directory, see [`dir`].
pub fn load<P>(param_file_path: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    let mut path = dir()?;
    path.push(param_file_path);

    load_from_path(path)
}

/// Load a parameter file from an explicit path.
pub fn load_from_path<P, Q>(path: Q) -> Result<P, LoadError>
where
    P: DeserializeOwned,
    Q: AsRef<Path>,
{
    // Load the file into a string
    let params_str = read_to_string(path.as_ref())
        .map_err(|e| LoadError::FileLoadError(path.as_ref().to_path_buf(), e))?;

    from_str(&params_str)
}

/// Parse parameters from a TOML string.
pub fn from_str<P>(params_str: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    toml::from_str(params_str).map_err(LoadError::DeserialiseError)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct TestParams {
        gain: f64,

        #[serde(default)]
        flag: bool,
    }

    #[test]
    fn test_from_str() {
        let p: TestParams = from_str("gain = 0.5").unwrap();
        assert_eq!(p.gain, 0.5);
        assert!(!p.flag);

        let p: TestParams = from_str("gain = 2.0\nflag = true").unwrap();
        assert_eq!(p.gain, 2.0);
        assert!(p.flag);
    }

    #[test]
    fn test_missing_required() {
        let r: Result<TestParams, _> = from_str("flag = true");
        assert!(matches!(r, Err(LoadError::DeserialiseError(_))));
    }

    #[test]
    fn test_missing_file() {
        let r: Result<TestParams, _> = load_from_path("/this/path/does/not/exist.toml");
        assert!(matches!(r, Err(LoadError::FileLoadError(_, _))));
    }
}
