use chiptrade::model::Model;
use std::fs::read_dir;
use std::path::{Path, PathBuf};

/// Get the path to the folder containing the example models.
fn get_demos_dir() -> PathBuf {
    Path::new(file!())
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("demos")
}

/// An integration test which attempts to load every example model
#[test]
fn test_model_from_path() {
    for entry in read_dir(get_demos_dir()).unwrap() {
        let path = entry.unwrap().path();
        let model = Model::from_path(&path)
            .unwrap_or_else(|err| panic!("Failed to load {}: {err:?}", path.display()));
        assert!(!model.parameters.years.is_empty());
    }
}
