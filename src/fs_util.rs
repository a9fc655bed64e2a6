use std::fs;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::KeggError;

pub fn read_keg_file(path: &Path) -> Result<String, KeggError> {
    let input_error = |message: String| KeggError::Input {
        path: path.to_path_buf(),
        message,
    };
    let file = fs::File::open(path).map_err(|err| input_error(err.to_string()))?;
    let mut text = String::new();
    let is_gzip = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);
    if is_gzip {
        GzDecoder::new(file)
            .read_to_string(&mut text)
            .map_err(|err| input_error(err.to_string()))?;
    } else {
        let mut file = file;
        file.read_to_string(&mut text)
            .map_err(|err| input_error(err.to_string()))?;
    }
    Ok(text)
}
