use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::{env, fs, io};

/// Reads a text file and returns all its lines as a `Vec<String>`.
///
/// - Reads the entire file into memory
/// - Splits on `\n` / `\r\n`
pub(crate) fn read_file<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(contents.lines().map(str::to_owned).collect())
}

/// Extracts the base filename without extension.
///
/// Examples:
/// - `"./data/poems.txt"` → `"poems"`
/// - `"poems.txt"` → `"poems"`
pub(crate) fn get_filename<P: AsRef<Path>>(input_path: P) -> io::Result<String> {
	let stem = input_path
		.as_ref()
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no filename"))?;

	Ok(stem.to_string_lossy().to_string())
}

/// Normalize a folder path.
///
/// - `"."` or `"./"` resolves to the current working directory
/// - Other paths are returned as-is (not canonicalized)
pub fn normalize_folder(input: &str) -> PathBuf {
	if input == "." || input == "./" {
		env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
	} else {
		PathBuf::from(input)
	}
}

/// Lists all files with a given extension in a directory, sorted by name.
///
/// Returns file names only (no paths).
pub fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<String>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();

		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			if let Some(name) = path.file_name() {
				files.push(name.to_string_lossy().to_string());
			}
		}
	}

	files.sort();
	Ok(files)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_list_files_filters_extension() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("b.txt"), "b").unwrap();
		fs::write(dir.path().join("a.txt"), "a").unwrap();
		fs::write(dir.path().join("notes.md"), "x").unwrap();
		fs::create_dir(dir.path().join("nested.txt")).unwrap();

		let files = list_files(dir.path(), "txt").unwrap();
		assert_eq!(files, vec!["a.txt".to_string(), "b.txt".to_string()]);
	}

	#[test]
	fn test_get_filename_strips_extension() {
		assert_eq!(get_filename("./data/poems.txt").unwrap(), "poems");
		assert_eq!(get_filename("poems").unwrap(), "poems");
	}

	#[test]
	fn test_read_file_splits_lines() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("corpus.txt");
		fs::write(&path, "one two\r\nthree\n").unwrap();

		assert_eq!(read_file(&path).unwrap(), vec!["one two".to_string(), "three".to_string()]);
	}
}
