use std::path::Path;

/// Número de registros de un CSV, sin contar la cabecera.
pub fn count_datapoints(path: &Path) -> Result<usize, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut count = 0;
    for record in reader.records() {
        record?;
        count += 1;
    }
    Ok(count)
}

/// Nombre de un dataset a partir del archivo: sin la extensión `.csv`.
pub fn dataset_name(file_name: &str) -> String {
    file_name
        .strip_suffix(".csv")
        .unwrap_or(file_name)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, path::PathBuf};

    fn temp_dir(sub: &str) -> PathBuf {
        let base = std::env::temp_dir().join("common_data_tests").join(sub);
        let _ = fs::remove_dir_all(&base);
        fs::create_dir_all(&base).unwrap();
        base
    }

    #[test]
    fn counts_rows_without_header() {
        let dir = temp_dir("rows");
        let path = dir.join("sales.csv");
        fs::write(&path, "x,y\n1,0\n2,1\n3,1\n").unwrap();

        assert_eq!(count_datapoints(&path).unwrap(), 3);
    }

    #[test]
    fn header_only_is_zero() {
        let dir = temp_dir("header");
        let path = dir.join("empty.csv");
        fs::write(&path, "x,y\n").unwrap();

        assert_eq!(count_datapoints(&path).unwrap(), 0);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = temp_dir("missing");
        assert!(count_datapoints(&dir.join("nope.csv")).is_err());
    }

    #[test]
    fn name_strips_csv_extension() {
        assert_eq!(dataset_name("sales.csv"), "sales");
        assert_eq!(dataset_name("sales.tsv"), "sales.tsv");
    }
}
