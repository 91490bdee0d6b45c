use std::path::Path;

use anyhow::{Context, Result};
use image::{GenericImage, RgbImage};
use tracing::debug;

use crate::tile::{TileRange, TILE_SIZE};

/// Stitch the persisted tiles of `range` into one contiguous RGB raster.
///
/// The result is sized `(cols * 256, rows * 256)`. Every tile file found in
/// `tile_folder` is decoded and copied into its block by pixel offset, with
/// any alpha channel dropped. Tiles with no backing file keep their block
/// zeroed (black), distinct from the white placeholders the fetcher writes,
/// so assembly stays usable independently of fetching.
pub fn assemble(range: &TileRange, tile_folder: &Path) -> Result<RgbImage> {
    let mut supertile = RgbImage::new(range.cols() * TILE_SIZE, range.rows() * TILE_SIZE);

    for tile in range.tiles() {
        let path = tile_folder.join(tile.file_name());
        if !path.exists() {
            debug!(?tile, "no tile file, leaving block black");
            continue;
        }

        let tile_img = image::open(&path)
            .with_context(|| format!("failed decoding tile image {}", path.display()))?
            .to_rgb8();

        let x_off = (tile.x - range.x_min) * TILE_SIZE;
        let y_off = (tile.y - range.y_min) * TILE_SIZE;
        supertile
            .copy_from(&tile_img, x_off, y_off)
            .with_context(|| format!("tile image {} does not fit its block", path.display()))?;
    }

    Ok(supertile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba, RgbaImage};

    use crate::tile::TileIndex;

    #[test]
    fn empty_folder_yields_black_raster_of_exact_size() {
        let dir = tempfile::tempdir().unwrap();
        let range = TileRange::new(4, 6, 2, 3, 8).unwrap();

        let supertile = assemble(&range, dir.path()).unwrap();

        assert_eq!(supertile.dimensions(), (3 * TILE_SIZE, 2 * TILE_SIZE));
        assert_eq!(supertile.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(
            supertile.get_pixel(3 * TILE_SIZE - 1, 2 * TILE_SIZE - 1),
            &Rgb([0, 0, 0])
        );
    }

    #[test]
    fn present_tiles_fill_their_block_missing_stay_black() {
        let dir = tempfile::tempdir().unwrap();
        let range = TileRange::new(4, 5, 2, 3, 8).unwrap();

        // only the north-east tile (x 5, y 2) exists
        let red = RgbImage::from_pixel(TILE_SIZE, TILE_SIZE, Rgb([200, 10, 10]));
        red.save(dir.path().join(TileIndex::new(5, 2, 8).file_name()))
            .unwrap();

        let supertile = assemble(&range, dir.path()).unwrap();

        // block offset: column 1, row 0
        assert_eq!(supertile.get_pixel(TILE_SIZE, 0), &Rgb([200, 10, 10]));
        assert_eq!(
            supertile.get_pixel(2 * TILE_SIZE - 1, TILE_SIZE - 1),
            &Rgb([200, 10, 10])
        );
        assert_eq!(supertile.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(supertile.get_pixel(0, TILE_SIZE), &Rgb([0, 0, 0]));
    }

    #[test]
    fn alpha_channel_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let range = TileRange::new(0, 0, 0, 0, 3).unwrap();

        let rgba = RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, Rgba([10, 20, 30, 128]));
        rgba.save(dir.path().join(TileIndex::new(0, 0, 3).file_name()))
            .unwrap();

        let supertile = assemble(&range, dir.path()).unwrap();

        assert_eq!(supertile.dimensions(), (TILE_SIZE, TILE_SIZE));
        assert_eq!(supertile.get_pixel(128, 128), &Rgb([10, 20, 30]));
    }
}
