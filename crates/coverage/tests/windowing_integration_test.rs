#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use approx::assert_relative_eq;
    use coverage::{
        AbstractRaster, Envelope, Error, GeoReference, MemoryTileContainer, MultiRangedRaster, OriginLocation, RasterData, RasterRect,
        Result, SampleNum, SimpleRaster, TiledRaster,
    };

    fn georef(location: OriginLocation, res: f64, origin_x: f64, origin_y: f64) -> GeoReference {
        GeoReference::with_origin(location, res, -res, origin_x, origin_y, None).expect("valid georeference")
    }

    /// Single band tile with its outer upper left corner at `x`, `top` filled with `value`
    fn tile<T: SampleNum>(x: f64, top: f64, size: usize, res: f64, value: T) -> AbstractRaster<T> {
        SimpleRaster::new(RasterData::filled_with(size, size, 1, value), georef(OriginLocation::Outer, res, x, top)).into()
    }

    fn tiled<T: SampleNum>(tiles: Vec<AbstractRaster<T>>) -> TiledRaster<T> {
        TiledRaster::new(Arc::new(MemoryTileContainer::with_tiles(tiles).expect("valid tiles")))
    }

    #[test]
    fn pixel_world_round_trip() {
        for location in [OriginLocation::Center, OriginLocation::Outer] {
            for res in [1.0, 0.1, 25.6, 0.000_833_333_333_333] {
                let georef = georef(location, res, 161_000.3, 243_000.7);
                for (px, py) in [(0, 0), (1, 1), (17, 3), (1000, 2500), (-5, 8)] {
                    let world = georef.world_coordinate(px as f64, py as f64);
                    assert_eq!(georef.raster_coordinate(world.x(), world.y()), (px, py), "{location} {res} ({px}, {py})");
                }
            }
        }
    }

    #[test]
    fn pixel_rect_covers_envelope() {
        let envelopes = [
            Envelope::from_bounds(0.0, 0.0, 10.0, 10.0),
            Envelope::from_bounds(0.3, 0.7, 9.1, 4.2),
            Envelope::from_bounds(2.5, 2.5, 2.6, 2.6),
            Envelope::from_bounds(-13.75, 1.25, 7.125, 19.999),
        ];

        for location in [OriginLocation::Center, OriginLocation::Outer] {
            let georef = georef(location, 0.5, 0.0, 20.0);
            for env in &envelopes {
                let rect = georef.convert_envelope_to_raster_crs(env);
                let covering = georef.envelope(OriginLocation::Outer, &rect, None);
                assert!(covering.contains(env), "{location}: {covering} does not cover {env}");
            }
        }
    }

    #[test]
    fn merging_with_itself_is_identity() -> Result<()> {
        for location in [OriginLocation::Center, OriginLocation::Outer] {
            let georef = georef(location, 10.0, 1000.0, 2000.0);
            let merged = GeoReference::merger(&georef, &georef)?;

            assert_eq!(merged.origin_location(), georef.origin_location());
            assert_eq!((merged.resolution_x(), merged.resolution_y()), (10.0, -10.0));
            assert_eq!(merged.origin(), georef.origin());
        }
        Ok(())
    }

    #[test]
    fn convention_round_trip() {
        let georef = georef(OriginLocation::Center, 10.0, 1005.0, 1995.0);
        let env = georef.pixel_footprint(&RasterRect::with_size(20, 20));

        let outer = georef.create_relocated_reference(Some(OriginLocation::Outer), &env);
        let center = outer.create_relocated_reference(Some(OriginLocation::Center), &env);

        assert_eq!(outer.origin_location(), OriginLocation::Outer);
        assert_relative_eq!(outer.origin(), coverage::Point::new(1000.0, 2000.0), epsilon = georef.delta());
        assert_eq!(center.origin_location(), OriginLocation::Center);
        assert_relative_eq!(center.origin(), georef.origin(), epsilon = georef.delta());
    }

    #[test_log::test]
    fn no_spurious_edge_tiles() -> Result<()> {
        let raster = tiled(vec![tile(0.0, 100.0, 100, 1.0, 1u8), tile(100.0, 100.0, 100, 1.0, 2u8)]);

        // the shared boundary line
        let boundary = Envelope::from_bounds(100.0, 0.0, 100.0, 100.0);
        assert!(raster.contributing_tiles(&boundary)?.is_empty());

        // a window ending on the boundary only uses the left tile
        let AbstractRaster::Tiled(window) = raster.sub_raster(&Envelope::from_bounds(50.0, 0.0, 100.0, 100.0))? else {
            panic!("expected a tiled window");
        };
        assert_eq!(window.tiles()?.len(), 1);
        assert!(window.as_simple_raster()?.data().to_vec()?.iter().all(|&v| v == 1));
        Ok(())
    }

    #[test_log::test]
    fn mosaic_has_no_seam_drift() -> Result<()> {
        let raster = AbstractRaster::from(tiled(vec![tile(0.0, 10.0, 10, 1.0, 1i32), tile(10.0, 10.0, 10, 1.0, 2i32)]));

        let mosaic = raster.sub_raster(&Envelope::from_bounds(0.0, 0.0, 20.0, 10.0))?.as_simple_raster()?;
        assert_eq!((mosaic.columns(), mosaic.rows()), (20, 10));
        for row in mosaic.data().band_samples(0)?.chunks(20) {
            assert_eq!(&row[..10], &[1; 10]);
            assert_eq!(&row[10..], &[2; 10]);
        }
        Ok(())
    }

    #[test_log::test]
    fn mosaic_does_not_depend_on_tile_order() -> Result<()> {
        let tiles = vec![
            tile(0.0, 10.0, 10, 1.0, 1u16),
            tile(10.0, 10.0, 10, 1.0, 2u16),
            tile(0.0, 20.0, 10, 1.0, 3u16),
            tile(10.0, 20.0, 10, 1.0, 4u16),
        ];
        let reversed: Vec<_> = tiles.iter().rev().cloned().collect();

        let forward = tiled(tiles).as_simple_raster()?;
        let backward = tiled(reversed).as_simple_raster()?;

        assert_eq!((forward.columns(), forward.rows()), (20, 20));
        assert_eq!(forward.data().to_vec()?, backward.data().to_vec()?);
        assert_eq!(forward.data().pixel(0, 0)?, vec![3]);
        assert_eq!(forward.data().pixel(19, 19)?, vec![2]);
        Ok(())
    }

    #[test_log::test]
    fn unaligned_window_over_tiles() -> Result<()> {
        let raster = tiled(vec![tile(0.0, 10.0, 10, 1.0, 1u8), tile(10.0, 10.0, 10, 1.0, 2u8)]);

        let window = raster.sub_raster(&Envelope::from_bounds(8.4, 2.5, 11.2, 7.5))?;
        assert_eq!(window.envelope(), Envelope::from_bounds(8.0, 2.0, 12.0, 8.0));

        let mosaic = window.as_simple_raster()?;
        assert_eq!((mosaic.columns(), mosaic.rows()), (4, 6));
        assert_eq!(&mosaic.data().band_samples(0)?[0..4], &[1, 1, 2, 2]);
        Ok(())
    }

    #[test]
    fn bounds_enforcement_and_full_view() -> Result<()> {
        let raster = tile(0.0, 10.0, 10, 1.0, 5u8);

        let outside = Envelope::from_bounds(5.0, 5.0, 15.0, 10.0);
        assert!(matches!(raster.sub_raster(&outside), Err(Error::Bounds { .. })));

        let full = raster.sub_raster(&raster.envelope())?.as_simple_raster()?;
        assert!(full.data().shares_storage_with(raster.as_simple_raster()?.data()));
        assert_eq!((full.columns(), full.rows()), (10, 10));
        Ok(())
    }

    #[test]
    fn view_writes_reach_the_parent() -> Result<()> {
        let parent = tile(0.0, 10.0, 10, 1.0, 0i16).as_simple_raster()?;
        let view = parent.sub_raster(&Envelope::from_bounds(4.0, 1.0, 7.0, 3.0))?;

        view.data().set_sample(2, 1, 0, 42)?;
        assert_eq!(parent.data().sample(6, 8, 0)?, 42);

        let writer = AbstractRaster::from(view);
        writer.set_sub_raster_at(0, 0, &tile(100.0, 100.0, 1, 1.0, 7i16))?;
        assert_eq!(parent.data().sample(4, 7, 0)?, 7);
        Ok(())
    }

    #[test]
    fn multi_ranged_windows_stack_bands() -> Result<()> {
        let ranges = vec![
            tile(0.0, 10.0, 10, 1.0, 1.5f32),
            AbstractRaster::from(tiled(vec![tile(0.0, 10.0, 5, 2.0, 2.5f32)])),
        ];
        let raster = MultiRangedRaster::new(ranges)?;

        let window = raster.sub_raster(&Envelope::from_bounds(2.0, 2.0, 6.0, 6.0))?;
        let stacked = window.as_simple_raster();

        // the ranges have different resolutions, their windows cannot be stacked
        assert!(matches!(stacked, Err(Error::ShapeMismatch(_))));

        let same_grid = MultiRangedRaster::new(vec![tile(0.0, 10.0, 10, 1.0, 1.5f32), tile(0.0, 10.0, 10, 1.0, 2.5f32)])?;
        let stacked = same_grid.sub_raster(&Envelope::from_bounds(2.0, 2.0, 6.0, 6.0))?.as_simple_raster()?;
        assert_eq!(stacked.band_count(), 2);
        assert_eq!(stacked.data().pixel(3, 3)?, vec![1.5, 2.5]);
        Ok(())
    }
}
