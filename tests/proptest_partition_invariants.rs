//! Property-based checks of the quadrant split geometry.
//!
//! 1. The four quadrants of any valid rectangle tile it with no gap and no
//!    overlap, including fractional coordinates.
//! 2. Quadrants of a valid rectangle are themselves valid.
//! 3. Repeated splitting of the working image keeps the frontier covering
//!    exactly the image area.

use proptest::prelude::*;
use quadtree_art::engine::{Config, Engine, Step};
use quadtree_art::Rect;

fn rect_strategy() -> impl Strategy<Value = Rect> {
	(0f64..4096., 0f64..4096., 1e-3f64..4096., 1e-3f64..4096.)
		.prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
}

fn close(a: f64, b: f64, scale: f64) -> bool {
	(a - b).abs() <= scale * 1e-12
}

proptest! {
	#[test]
	fn quadrants_tile_parent(r in rect_strategy()) {
		let [tl, tr, bl, br] = r.quadrants();
		let scale = r.x.abs() + r.y.abs() + r.width + r.height;

		// shared edges line up
		prop_assert_eq!(tl.x, r.x);
		prop_assert_eq!(tl.y, r.y);
		prop_assert_eq!(tr.x, tl.x + tl.width);
		prop_assert_eq!(bl.y, tl.y + tl.height);
		prop_assert_eq!(br.x, tr.x);
		prop_assert_eq!(br.y, bl.y);
		prop_assert_eq!(tr.y, r.y);
		prop_assert_eq!(bl.x, r.x);

		// outer edges match the parent
		prop_assert!(close(tr.x + tr.width, r.x + r.width, scale));
		prop_assert!(close(bl.y + bl.height, r.y + r.height, scale));

		// equal halves, so the areas add up without overlap
		for q in [tl, tr, bl, br].iter() {
			prop_assert_eq!(q.width, r.width / 2.);
			prop_assert_eq!(q.height, r.height / 2.);
		}
		prop_assert_eq!(tl.width + tr.width, r.width);
		prop_assert_eq!(tl.height + bl.height, r.height);
	}

	#[test]
	fn quadrants_stay_valid(r in rect_strategy()) {
		prop_assert!(r.quadrants().iter().all(Rect::is_valid));
	}

	#[test]
	fn frontier_covers_image(w in 1u32..80, h in 1u32..80, steps in 0usize..40, seed in any::<u8>()) {
		let img = image::RgbaImage::from_fn(w, h, |x, y| {
			let v = (x.wrapping_mul(31) ^ y.wrapping_mul(17)).wrapping_add(seed as u32) as u8;
			image::Rgba([v, v / 2, 255 - v, 255])
		});
		let mut engine = Engine::new(Config::new(1, 0., 0.).unwrap());
		engine.reset(&img).unwrap();
		for _ in 0..steps {
			if let Step::Stalled(_) = engine.step().unwrap() {
				break;
			}
		}
		let area: f64 = engine.frontier().map(|n| n.rect().area()).sum();
		let expected = w as f64 * h as f64;
		prop_assert!(close(area, expected, expected));
		prop_assert_eq!(engine.shape_count() as u64, 1 + 3 * engine.iterations());
	}
}
