use std::{fmt::Debug, path::PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub fn read_toml<P: Into<PathBuf> + Debug, T: for<'de> Deserialize<'de>>(
    path: P,
) -> anyhow::Result<T> {
    let path = path.into();
    (|| toml::from_str(&fs_err::read_to_string(&path)?).map_err(anyhow::Error::new))().with_context(
        || {
            format!(
                "While trying to parse {path:?} as {}",
                std::any::type_name::<T>()
            )
        },
    )
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde::Deserialize;

    use super::read_toml;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Sample {
        top: usize,
        output: String,
    }

    #[test]
    fn reads_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "top = 5\noutput = \"chart.svg\"").unwrap();
        let sample: Sample = read_toml(file.path()).unwrap();
        assert_eq!(
            sample,
            Sample {
                top: 5,
                output: "chart.svg".to_owned()
            }
        );
    }

    #[test]
    fn reports_the_path_on_failure() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "top = \"five\"").unwrap();
        let err = read_toml::<_, Sample>(file.path()).unwrap_err();
        assert!(format!("{err}").contains("While trying to parse"));
    }
}
