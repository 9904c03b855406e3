use std::path::{Path, PathBuf};

use image::{ColorType, ImageError};
use thiserror::Error;

use crate::buffer::Raster;
use crate::types::Channels;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("could not open or decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: ImageError,
    },

    #[error("{path} contains no pixels")]
    Empty { path: PathBuf },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("could not write {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: ImageError,
    },

    #[error("image dimensions {width}x{height} exceed the encoder limits")]
    TooLarge { width: usize, height: usize },
}

pub fn load(path: &Path, channels: Channels) -> Result<Raster, LoadError> {
    let image = image::open(path).map_err(|source| LoadError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    let (width, height, raw) = match channels {
        Channels::Gray => {
            let gray = image.to_luma8();
            (gray.width(), gray.height(), gray.into_raw())
        }
        Channels::Rgb => {
            let rgb = image.to_rgb8();
            (rgb.width(), rgb.height(), rgb.into_raw())
        }
    };

    if width == 0 || height == 0 {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }

    Raster::from_raw(width as usize, height as usize, channels.count(), raw).ok_or_else(|| {
        LoadError::Empty {
            path: path.to_path_buf(),
        }
    })
}

// format follows the extension
pub fn store(path: &Path, raster: &Raster) -> Result<(), StoreError> {
    let (width, height) = (raster.width(), raster.height());
    let too_large = || StoreError::TooLarge { width, height };
    let w = u32::try_from(width).map_err(|_| too_large())?;
    let h = u32::try_from(height).map_err(|_| too_large())?;

    let color = match raster.channels() {
        3 => ColorType::Rgb8,
        _ => ColorType::L8,
    };
    let raw: Vec<u8> = raster.view().iter().copied().collect();

    image::save_buffer(path, &raw, w, h, color).map_err(|source| StoreError::Encode {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_round_trip_gray() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        let raster = Raster::from_raw(3, 2, 1, vec![0, 10, 20, 30, 40, 255]).unwrap();

        store(&path, &raster).unwrap();
        assert_eq!(load(&path, Channels::Gray).unwrap(), raster);
    }

    #[test]
    fn tiff_round_trip_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("color.tiff");
        let raster = Raster::from_raw(2, 2, 3, (0..12).map(|v| v * 20).collect()).unwrap();

        store(&path, &raster).unwrap();
        assert_eq!(load(&path, Channels::Rgb).unwrap(), raster);
    }

    #[test]
    fn gray_file_loaded_as_color_is_replicated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        store(&path, &Raster::from_raw(1, 1, 1, vec![77]).unwrap()).unwrap();

        let rgb = load(&path, Channels::Rgb).unwrap();
        assert_eq!(rgb.into_raw_vec(), vec![77, 77, 77]);
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = load(Path::new("/definitely/not/here.png"), Channels::Gray).unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
    }

    #[test]
    fn unwritable_destination_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("out.png");
        let err = store(&path, &Raster::zeros(2, 2, 1)).unwrap_err();
        assert!(matches!(err, StoreError::Encode { .. }));
    }
}
