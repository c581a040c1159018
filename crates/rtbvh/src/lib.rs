//! rtbvh - BVH construction for GPU ray tracing.
//!
//! Builds a bounding volume hierarchy over a triangle soup with the Surface
//! Area Heuristic and flattens it into three arrays a compute kernel can walk
//! without recursion:
//!
//! - **Boxes**: one [`Aabb`] per node (6 floats)
//! - **Nodes**: one [`FlatNode`] per node (`[child_a, child_b, parent, depth, is_leaf]`)
//! - **Primitive indices**: original triangle indices, contiguous per leaf
//!
//! # Example
//!
//! ```ignore
//! use rtbvh::{Bvh, BuildOptions, TriangleSoup};
//!
//! let soup = TriangleSoup::new(&vertices)?;
//! let bvh = Bvh::build(soup, &BuildOptions::default())?;
//! queue.write_buffer(&node_buffer, 0, bytemuck::cast_slice(bvh.node_words()));
//! ```

mod bounds;
mod build;
mod bvh;
mod cost;
mod error;
mod flatten;
mod options;
mod soup;
mod stats;
mod validate;

pub use bounds::{compute_triangle_bbox, compute_union_bbox};
pub use build::{build, BuildNode, BuildTree, BvhBuilder};
pub use bvh::Bvh;
pub use cost::{MedianCost, SplitCost, SurfaceAreaCost, VolumeCost};
pub use error::{BvhError, BvhResult};
pub use flatten::{flatten, FlatArrays, FlatNode};
pub use options::{BuildOptions, CostModel, MAX_DEPTH_LIMIT};
pub use soup::TriangleSoup;
pub use stats::BvhStats;
pub use validate::{validate, validate_arrays, StructureError};

/// Re-export the math types that appear in the public API
pub use rtbvh_math::{Aabb, Ray, Vec3, BOX_PADDING};

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn triangle_at(offset: Vec3) -> [Vec3; 3] {
        [offset, offset + Vec3::X, offset + Vec3::Y]
    }

    fn random_soup(count: usize, seed: u64) -> Vec<Vec3> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .flat_map(|_| {
                let o = Vec3::new(
                    rng.gen_range(-100.0..100.0),
                    rng.gen_range(-100.0..100.0),
                    rng.gen_range(-100.0..100.0),
                );
                let mut edge = || {
                    Vec3::new(
                        rng.gen_range(0.0..2.0),
                        rng.gen_range(0.0..2.0),
                        rng.gen_range(0.0..2.0),
                    )
                };
                let e1 = edge();
                let e2 = edge();
                [o, o + e1, o + e2]
            })
            .collect()
    }

    #[test]
    fn test_two_disjoint_triangles() {
        let mut vertices = triangle_at(Vec3::ZERO).to_vec();
        vertices.extend(triangle_at(Vec3::new(100.0, 0.0, 0.0)));
        let soup = TriangleSoup::new(&vertices).unwrap();
        let bvh = Bvh::build(soup, &BuildOptions::default().with_max_leaf_size(1)).unwrap();

        let nodes = bvh.nodes();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].children(), Some((1, 2)));
        assert_eq!(nodes[1].primitives(), Some((0, 1)));
        assert_eq!(nodes[2].primitives(), Some((1, 1)));
        // Split along x: the left child sits entirely left of the right child
        assert!(bvh.boxes()[1].max.x < bvh.boxes()[2].min.x);
        assert_eq!(bvh.primitive_indices(), &[0, 1]);
        assert_eq!(validate(&bvh), Ok(()));
    }

    #[test]
    fn test_single_triangle() {
        let vertices = triangle_at(Vec3::ZERO);
        let soup = TriangleSoup::new(&vertices).unwrap();
        let bvh = Bvh::build(soup, &BuildOptions::default()).unwrap();

        assert_eq!(
            bvh.nodes(),
            &[FlatNode {
                child_a: 0,
                child_b: 1,
                parent: -1,
                depth: 0,
                is_leaf: 1
            }]
        );
        assert_eq!(bvh.primitive_indices(), &[0]);
    }

    #[test]
    fn test_sixteen_coincident_triangles() {
        let vertices: Vec<Vec3> = (0..16).flat_map(|_| triangle_at(Vec3::ONE)).collect();
        let soup = TriangleSoup::new(&vertices).unwrap();
        let bvh = Bvh::build(soup, &BuildOptions::default()).unwrap();

        assert_eq!(bvh.node_count(), 1);
        assert_eq!(bvh.nodes()[0].primitives(), Some((0, 16)));
        assert_eq!(bvh.stats().oversized_leaves, 1);
        assert_eq!(validate(&bvh), Ok(()));
    }

    #[test]
    fn test_nine_triangles_split_once() {
        let vertices: Vec<Vec3> = (0..9)
            .flat_map(|i| triangle_at(Vec3::new(i as f32 * 5.0, 0.0, 0.0)))
            .collect();
        let soup = TriangleSoup::new(&vertices).unwrap();
        let bvh = Bvh::build(soup, &BuildOptions::default()).unwrap();

        let nodes = bvh.nodes();
        assert_eq!(nodes[0].is_leaf, 0);
        let (a, b) = nodes[0].children().unwrap();
        let (_, count_a) = nodes[a].primitives().unwrap();
        let (_, count_b) = nodes[b].primitives().unwrap();
        assert_eq!(count_a + count_b, 9);
    }

    #[test]
    fn test_partition_and_containment_random() {
        for seed in 0..4 {
            let vertices = random_soup(2000, seed);
            let soup = TriangleSoup::new(&vertices).unwrap();
            let bvh = Bvh::build(soup, &BuildOptions::default()).unwrap();

            assert_eq!(validate(&bvh), Ok(()), "seed {seed}");

            let mut prims = bvh.primitive_indices().to_vec();
            prims.sort_unstable();
            assert_eq!(prims, (0..2000).collect::<Vec<u32>>());

            let stats = bvh.stats();
            assert_eq!(stats.primitive_count, 2000);
            assert_eq!(stats.node_count, 2 * stats.leaf_count - 1);
            assert_eq!(stats.oversized_leaves, 0);
        }
    }

    #[test]
    fn test_degenerate_triangles() {
        // Points and lines mixed with a few proper triangles
        let mut vertices = Vec::new();
        for i in 0..50 {
            let p = Vec3::new(i as f32, 0.0, 0.0);
            vertices.extend([p, p, p]);
            vertices.extend([p, p + Vec3::Z, p + Vec3::Z * 2.0]);
        }
        vertices.extend(triangle_at(Vec3::splat(3.0)));
        let soup = TriangleSoup::new(&vertices).unwrap();
        let bvh = Bvh::build(soup, &BuildOptions::default()).unwrap();

        assert_eq!(validate(&bvh), Ok(()));
        assert!(bvh.boxes().iter().all(|b| b.extent().cmpgt(Vec3::ZERO).all()));
    }

    #[test]
    fn test_flat_triangles_far_from_origin() {
        // Flat in z at a magnitude where 0.001 is lost to rounding
        let mut vertices = Vec::new();
        for i in 0..20 {
            let o = Vec3::new(40000.0 + i as f32 * 4.0, 40000.0, 40000.0);
            vertices.extend([o, o + Vec3::X, o + Vec3::Y]);
        }
        let soup = TriangleSoup::new(&vertices).unwrap();
        let bvh = Bvh::build(soup, &BuildOptions::default()).unwrap();

        assert!(bvh.node_count() > 1);
        assert_eq!(validate(&bvh), Ok(()));
        assert!(bvh.boxes().iter().all(|b| b.extent().cmpgt(Vec3::ZERO).all()));

        let single = TriangleSoup::new(&vertices[..3]).unwrap();
        let bvh = Bvh::build(single, &BuildOptions::default()).unwrap();
        assert!(bvh.boxes()[0].extent().z > 0.0);
    }

    #[test]
    fn test_build_is_deterministic() {
        let vertices = random_soup(5000, 11);
        let soup = TriangleSoup::new(&vertices).unwrap();
        let options = BuildOptions::default();

        let a = Bvh::build(soup, &options).unwrap();
        let b = Bvh::build(soup, &options).unwrap();
        assert_eq!(a.box_floats(), b.box_floats());
        assert_eq!(a.node_words(), b.node_words());
        assert_eq!(a.primitive_indices(), b.primitive_indices());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let vertices = random_soup(20_000, 5);
        let soup = TriangleSoup::new(&vertices).unwrap();
        let parallel = BuildOptions {
            parallel_threshold: 64,
            ..Default::default()
        };
        let sequential = BuildOptions::default().with_parallel(false);

        let a = Bvh::build(soup, &parallel).unwrap();
        let b = Bvh::build(soup, &sequential).unwrap();
        assert_eq!(a.box_floats(), b.box_floats());
        assert_eq!(a.node_words(), b.node_words());
        assert_eq!(a.primitive_indices(), b.primitive_indices());
    }

    #[test]
    fn test_max_depth_bounds_tree() {
        let vertices = random_soup(3000, 8);
        let soup = TriangleSoup::new(&vertices).unwrap();
        let options = BuildOptions::default().with_max_leaf_size(1).with_max_depth(4);
        let bvh = Bvh::build(soup, &options).unwrap();

        // Leaves may sit one level below the limit
        assert!(bvh.stats().max_depth <= 5);
        assert_eq!(validate(&bvh), Ok(()));
    }

    #[test]
    fn test_lopsided_splits_stop_at_depth_limit() {
        // Every cut peels a single triangle off the end, so only the depth
        // limit keeps the tree shallow
        let vertices: Vec<Vec3> = (0..10_000)
            .flat_map(|i| triangle_at(Vec3::new(i as f32 * 2.0, 0.0, 0.0)))
            .collect();
        let soup = TriangleSoup::new(&vertices).unwrap();
        let options = BuildOptions {
            split_ratios: vec![0.0001],
            ..BuildOptions::default()
                .with_max_leaf_size(1)
                .with_max_depth(MAX_DEPTH_LIMIT)
        };

        let bvh = Bvh::build(soup, &options).unwrap();
        assert_eq!(validate(&bvh), Ok(()));
        assert_eq!(bvh.stats().max_depth, MAX_DEPTH_LIMIT + 1);
        assert_eq!(bvh.stats().primitive_count, 10_000);

        let unbounded = options.clone().with_max_depth(u32::MAX);
        assert!(matches!(
            Bvh::build(soup, &unbounded),
            Err(BvhError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_sah_isolates_cluster_median_does_not() {
        // 700 tiny triangles near the origin, 300 normal ones far along +x
        let mut vertices: Vec<Vec3> = random_soup(700, 21).into_iter().map(|v| v * 0.01).collect();
        vertices.extend(
            random_soup(300, 22)
                .into_iter()
                .map(|v| v + Vec3::new(1000.0, 0.0, 0.0)),
        );
        let soup = TriangleSoup::new(&vertices).unwrap();

        let sah = Bvh::build(soup, &BuildOptions::default()).unwrap();
        let (left, _) = sah.nodes()[0].children().unwrap();
        assert_eq!(sah.stats().primitive_count, 1000);
        assert!(sah.boxes()[left].max.x < 10.0);

        let median = Bvh::build(
            soup,
            &BuildOptions::default().with_cost_model(CostModel::Median),
        )
        .unwrap();
        let (_, right) = median.nodes()[0].children().unwrap();
        // The right half straddles both clusters
        assert!(median.boxes()[right].min.x < 10.0);
        assert!(median.boxes()[right].max.x > 900.0);
        assert!(sah.stats().sah_cost < median.stats().sah_cost);
    }

    #[test]
    fn test_custom_cost() {
        struct PreferLeftHeavy;
        impl SplitCost for PreferLeftHeavy {
            fn cost(&self, _: &Aabb, left_count: usize, _: &Aabb, right_count: usize) -> f32 {
                right_count as f32 - left_count as f32
            }
        }

        let vertices: Vec<Vec3> = (0..10)
            .flat_map(|i| triangle_at(Vec3::new(i as f32 * 4.0, 0.0, 0.0)))
            .collect();
        let soup = TriangleSoup::new(&vertices).unwrap();
        let bvh = BvhBuilder::new()
            .with_cost(PreferLeftHeavy)
            .build(soup)
            .unwrap();

        // 0.7 of 10 wins: left child holds 7
        let (left, right) = bvh.nodes()[0].children().unwrap();
        assert_eq!(bvh.nodes()[left].primitives().map(|p| p.1), Some(7));
        assert_eq!(bvh.nodes()[right].primitives().map(|p| p.1), Some(3));
    }

    #[test]
    fn test_flat_input() {
        let floats: Vec<f32> = (0..27).map(|i| (i * 13 % 17) as f32).collect();
        let soup = TriangleSoup::from_flat(&floats).unwrap();
        let bvh = Bvh::build(soup, &BuildOptions::default()).unwrap();

        assert_eq!(bvh.soup().triangle_count(), 3);
        assert_eq!(validate(&bvh), Ok(()));
    }
}
