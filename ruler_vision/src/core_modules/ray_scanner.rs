// THEORY:
// The `ray_scanner` answers the plain pointer-move question: how far does the
// surface under the pointer extend up, right, down and left?
//
// Algorithm:
// 1.  **Primary rays**: from the query point, step outwards one pixel at a time in
//     each direction. A step counts while the probe is inside the image and its
//     lightness differs from the previous counted pixel by less than the ray
//     threshold. The comparison is against the *previous* pixel, so gentle
//     gradients are followed while hard edges stop the ray.
// 2.  **Degenerate check**: if the four distances sum to `degenerate_area` or less,
//     the pointer sits on a thin line or a cluster of sharp edges and the primary
//     rays stopped almost immediately.
// 3.  **Streak rays**: in that case every ray is redone, counting every in-bounds
//     step regardless of lightness. A run of `similar_streak_length` consecutive
//     similar steps means the ray has crossed into a uniform surface; the run plus
//     the step that started it is taken back off and the ray stops. Running into
//     the image edge ends the ray with its full count.
//
// Rays are bounded by the image size and never suspend.

pub mod ray_scanner {
    use crate::config::RulerConfig;
    use crate::core_modules::geometry::{Direction, Extents, Point};
    use crate::core_modules::lightness_map::lightness_map::LightnessMap;
    use crate::core_modules::pixel::pixel::Lightness;
    use crate::error::{MeasureError, MeasureResult};

    /// Measures the four directional distances from `origin`.
    pub fn measure_distances(
        map: &LightnessMap,
        origin: Point,
        config: &RulerConfig,
    ) -> MeasureResult<Extents> {
        let start = map.get_at(origin).ok_or(MeasureError::OutOfRange {
            x: origin.x,
            y: origin.y,
        })?;

        let mut extents = Extents::default();
        for direction in Direction::ALL {
            let distance = primary_ray(map, origin, start, direction, config.ray_threshold);
            extents.set(direction, distance);
        }

        if extents.total() > config.degenerate_area {
            return Ok(extents);
        }

        tracing::trace!(
            x = origin.x,
            y = origin.y,
            area = extents.total(),
            "degenerate ray scan, retrying with streak rays"
        );

        let mut extents = Extents::default();
        for direction in Direction::ALL {
            let distance = streak_ray(map, origin, start, direction, config);
            extents.set(direction, distance);
        }
        Ok(extents)
    }

    fn primary_ray(
        map: &LightnessMap,
        origin: Point,
        start: Lightness,
        direction: Direction,
        threshold: Lightness,
    ) -> u32 {
        let mut distance = 0;
        let mut last = start;
        let mut probe = origin.step(direction);

        while let Some(current) = map.get_at(probe) {
            if (current - last).abs() >= threshold {
                break;
            }
            distance += 1;
            last = current;
            probe = probe.step(direction);
        }

        distance
    }

    fn streak_ray(
        map: &LightnessMap,
        origin: Point,
        start: Lightness,
        direction: Direction,
        config: &RulerConfig,
    ) -> u32 {
        let mut distance: u32 = 0;
        let mut streak = 0;
        let mut last = start;
        let mut probe = origin.step(direction);

        while let Some(current) = map.get_at(probe) {
            distance += 1;
            if (current - last).abs() < config.ray_threshold {
                streak += 1;
                if streak == config.similar_streak_length {
                    return distance.saturating_sub(config.streak_correction());
                }
            } else {
                last = current;
                streak = 0;
            }
            probe = probe.step(direction);
        }

        distance
    }
}
