//! End-to-end composition scenarios

use std::sync::Arc;

use approx::assert_relative_eq;

use super::*;
use crate::category::{Category, ForceMode};
use crate::geometry::Aabb;
use crate::producer::LayerMask;
use crate::shape::Shape;
use crate::spatial::{MeshIndexConfig, TriangleMesh};

const EPSILON: f32 = 1e-5;

fn gravity() -> CategoryId {
    CategoryId::gravity()
}

/// Surface producer on a sphere of radius 2 at the origin
fn sphere_field() -> ForceField {
    let mut field = ForceField::new();
    field
        .register(
            ForceProducer::surface(Shape::sphere(2.0), 0.0)
                .with_category("gravity")
                .with_strength(5.0)
                .with_falloff(1.0)
                .with_importance(1),
        )
        .unwrap();
    field
}

#[test]
fn test_sphere_producer_inside_surface() {
    let field = sphere_field();
    let point = Vec3::new(0.0, 1.5, 0.0);
    let force = field.query_category(point, &gravity(), None).unwrap();
    assert_relative_eq!(force, Vec3::new(0.0, -5.0, 0.0), epsilon = EPSILON);
}

#[test]
fn test_sphere_producer_in_falloff_band() {
    let field = sphere_field();
    let direction = Vec3::new(1.0, -1.0, 0.5).normalize();
    let force = field.query_category(direction * 2.5, &gravity(), None).unwrap();
    assert_relative_eq!(force.magnitude(), 2.5, epsilon = EPSILON);
    assert_relative_eq!(force.normalize(), -direction, epsilon = EPSILON);
}

#[test]
fn test_sphere_producer_out_of_range() {
    let field = sphere_field();
    let force = field.query_category(Vec3::new(4.0, 0.0, 0.0), &gravity(), None).unwrap();
    assert_eq!(force, Vec3::zeros());
}

#[test]
fn test_no_producers_yields_zero() {
    let field = ForceField::new();
    assert_eq!(field.query_category(Vec3::new(1.0, 2.0, 3.0), &gravity(), None).unwrap(), Vec3::zeros());
    assert!(field.query_all_categories(Vec3::zeros(), None).unwrap().is_empty());
}

#[test]
fn test_higher_importance_overrides() {
    for (high, low) in [(10, 1), (5, 1)] {
        let mut field = ForceField::new();
        // Registered low first so registration order cannot decide the outcome
        field
            .register(
                ForceProducer::global(Vec3::x())
                    .with_category("gravity")
                    .with_strength(3.0)
                    .with_importance(low),
            )
            .unwrap();
        field
            .register(
                ForceProducer::global(Vec3::y())
                    .with_category("gravity")
                    .with_strength(7.0)
                    .with_importance(high),
            )
            .unwrap();

        let force = field.query_category(Vec3::zeros(), &gravity(), None).unwrap();
        assert_relative_eq!(force, Vec3::new(0.0, 7.0, 0.0));
    }
}

#[test]
fn test_negative_importance_closest_to_zero_is_least_important() {
    let mut field = ForceField::new();
    field
        .register(ForceProducer::global(Vec3::x()).with_category("gravity").with_importance(-1))
        .unwrap();
    field
        .register(ForceProducer::global(Vec3::y()).with_category("gravity").with_importance(-4))
        .unwrap();
    field
        .register(ForceProducer::global(Vec3::z()).with_category("gravity").with_importance(0))
        .unwrap();

    let force = field.query_category(Vec3::zeros(), &gravity(), None).unwrap();
    assert_relative_eq!(force, Vec3::new(0.0, 10.0, 0.0));
}

#[test]
fn test_partial_override_blends_with_lower_importance() {
    let mut field = ForceField::new();
    let bounds = Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
    field
        .register(
            ForceProducer::zone(bounds, Vec3::x())
                .with_category("gravity")
                .with_strength(4.0)
                .with_falloff(2.0)
                .with_importance(10),
        )
        .unwrap();
    field
        .register(
            ForceProducer::global(Vec3::y())
                .with_category("gravity")
                .with_strength(4.0)
                .with_importance(1),
        )
        .unwrap();

    // One unit outside the zone: the zone covers half, the global the rest
    let force = field.query_category(Vec3::new(0.0, 2.0, 0.0), &gravity(), None).unwrap();
    assert_relative_eq!(force, Vec3::new(2.0, 2.0, 0.0), epsilon = EPSILON);

    // Inside the zone the global producer is hidden entirely
    let force = field.query_category(Vec3::zeros(), &gravity(), None).unwrap();
    assert_relative_eq!(force, Vec3::new(4.0, 0.0, 0.0));
}

#[test]
fn test_additive_sums_on_top_of_override() {
    let mut field = ForceField::new();
    field
        .register(ForceProducer::global(Vec3::x()).with_category("wind").with_strength(2.0))
        .unwrap();
    field
        .register(
            ForceProducer::global(Vec3::y())
                .with_category("wind")
                .with_strength(3.0)
                .with_additive(true),
        )
        .unwrap();

    let wind = CategoryId::wind();
    assert_relative_eq!(field.query_weighted(Vec3::zeros(), &wind, None).unwrap(), Vec3::new(2.0, 0.0, 0.0));
    assert_relative_eq!(field.query_additive(Vec3::zeros(), &wind, None).unwrap(), Vec3::new(0.0, 3.0, 0.0));
    assert_relative_eq!(field.query_category(Vec3::zeros(), &wind, None).unwrap(), Vec3::new(2.0, 3.0, 0.0));
}

#[test]
fn test_additive_producers_ignore_importance_and_scale_by_strength() {
    let mut field = ForceField::new();
    let center = Vec3::zeros();
    field
        .register(
            ForceProducer::point(center, 1.0)
                .with_category("wind")
                .with_strength(4.0)
                .with_falloff(2.0)
                .with_additive(true)
                .with_importance(100),
        )
        .unwrap();
    field
        .register(
            ForceProducer::global(Vec3::x())
                .with_category("wind")
                .with_strength(1.0)
                .with_additive(true)
                .with_importance(-100),
        )
        .unwrap();

    // Point producer at half strength along +X, global at full strength
    let force = field.query_category(Vec3::new(2.0, 0.0, 0.0), &CategoryId::wind(), None).unwrap();
    assert_relative_eq!(force, Vec3::new(3.0, 0.0, 0.0), epsilon = EPSILON);
}

#[test]
fn test_disabled_producers_are_skipped() {
    let mut field = ForceField::new();
    let handle = field
        .register(ForceProducer::global(Vec3::x()).with_category("gravity").with_importance(10))
        .unwrap();
    field
        .register(ForceProducer::global(Vec3::y()).with_category("gravity").with_importance(1))
        .unwrap();

    field.update_producer(handle, |p| p.enabled = false).unwrap();
    let force = field.query_category(Vec3::zeros(), &gravity(), None).unwrap();
    assert_relative_eq!(force, Vec3::new(0.0, 10.0, 0.0));
}

#[test]
fn test_layer_filter() {
    let mut field = ForceField::new();
    field
        .register(
            ForceProducer::global(Vec3::x())
                .with_category("gravity")
                .with_importance(10)
                .with_layers(LayerMask::from_layer(3)),
        )
        .unwrap();
    field
        .register(ForceProducer::global(Vec3::y()).with_category("gravity").with_importance(1))
        .unwrap();

    let on_three = field.query_category(Vec3::zeros(), &gravity(), Some(3)).unwrap();
    assert_relative_eq!(on_three, Vec3::new(10.0, 0.0, 0.0));

    let on_zero = field.query_category(Vec3::zeros(), &gravity(), Some(0)).unwrap();
    assert_relative_eq!(on_zero, Vec3::new(0.0, 10.0, 0.0));

    let unfiltered = field.query_category(Vec3::zeros(), &gravity(), None).unwrap();
    assert_relative_eq!(unfiltered, Vec3::new(10.0, 0.0, 0.0));
}

#[test]
fn test_category_mixing() {
    let mut categories = CategoryTable::with_defaults();
    categories.insert(Category::new("gravity", ForceMode::Acceleration).with_mixes(["wind"]));
    let mut field = ForceField::with_categories(categories);

    field
        .register(
            ForceProducer::global(Vec3::x())
                .with_category("wind")
                .with_strength(1.0)
                .with_additive(true),
        )
        .unwrap();
    field
        .register(
            ForceProducer::global(Vec3::y())
                .with_category("gravity")
                .with_strength(2.0)
                .with_additive(true),
        )
        .unwrap();

    // Gravity accepts wind, wind does not accept gravity
    let gravity_force = field.query_category(Vec3::zeros(), &gravity(), None).unwrap();
    assert_relative_eq!(gravity_force, Vec3::new(1.0, 2.0, 0.0));
    let wind_force = field.query_category(Vec3::zeros(), &CategoryId::wind(), None).unwrap();
    assert_relative_eq!(wind_force, Vec3::new(1.0, 0.0, 0.0));

    let all = field.query_all_categories(Vec3::zeros(), None).unwrap();
    assert_eq!(all.len(), 2);
    assert_relative_eq!(all[&CategoryId::gravity()], Vec3::new(1.0, 2.0, 0.0));
    assert_relative_eq!(all[&CategoryId::wind()], Vec3::new(1.0, 0.0, 0.0));
}

#[test]
fn test_invert_reverses_contribution() {
    let mut field = sphere_field();
    let handle = field.iter().next().map(|(h, _)| h).unwrap();
    field.update_producer(handle, |p| p.invert = true).unwrap();

    let force = field.query_category(Vec3::new(0.0, 2.5, 0.0), &gravity(), None).unwrap();
    assert_relative_eq!(force, Vec3::new(0.0, 2.5, 0.0), epsilon = EPSILON);
}

#[test]
fn test_moving_a_shape_updates_results() {
    let mut field = sphere_field();
    let handle = field.iter().next().map(|(h, _)| h).unwrap();
    let point = Vec3::new(10.0, 1.5, 0.0);
    assert_eq!(field.query_category(point, &gravity(), None).unwrap(), Vec3::zeros());

    field
        .update_producer(handle, |p| {
            if let Some(shape) = p.shape_mut() {
                shape.set_position(Vec3::new(10.0, 0.0, 0.0));
            }
        })
        .unwrap();
    let force = field.query_category(point, &gravity(), None).unwrap();
    assert_relative_eq!(force, Vec3::new(0.0, -5.0, 0.0), epsilon = EPSILON);
}

#[test]
fn test_mesh_producer() {
    let mesh = Arc::new(TriangleMesh::cube(1.0));
    let shape = Shape::mesh(mesh, MeshIndexConfig::default());
    let mut field = ForceField::new();
    field
        .register(
            ForceProducer::surface(shape, 0.0)
                .with_category("gravity")
                .with_strength(2.0)
                .with_falloff(2.0),
        )
        .unwrap();

    // One unit above the +Y face: half strength, pulled down
    let force = field.query_category(Vec3::new(0.2, 2.0, -0.3), &gravity(), None).unwrap();
    assert!(force.y < 0.0);
    assert_relative_eq!(force.magnitude(), 1.0, epsilon = 1e-2);
}

#[test]
fn test_unbuilt_mesh_index_is_an_error() {
    let shape = Shape::mesh_unindexed(Arc::new(TriangleMesh::cube(1.0)), MeshIndexConfig::default());
    let mut field = ForceField::new();
    field
        .register(ForceProducer::surface(shape, 0.0).with_category("gravity").with_falloff(1.0))
        .unwrap();

    let result = field.query_category(Vec3::zeros(), &gravity(), None);
    assert_eq!(result, Err(FieldError::Shape(ShapeError::IndexNotBuilt)));
}

#[test]
fn test_batch_query_includes_categories_reached_through_mixing() {
    let mut categories = CategoryTable::with_defaults();
    categories.insert(Category::new("gravity", ForceMode::Acceleration).with_mixes(["wind"]));
    let mut field = ForceField::with_categories(categories);
    field
        .register(ForceProducer::global(Vec3::x()).with_category("wind").with_strength(1.0))
        .unwrap();

    let point = Vec3::new(0.5, -2.0, 1.0);
    let gravity_force = field.query_category(point, &gravity(), None).unwrap();
    assert_relative_eq!(gravity_force, Vec3::new(1.0, 0.0, 0.0));

    let all = field.query_all_categories(point, None).unwrap();
    assert_eq!(all.len(), 2);
    for (category, force) in &all {
        assert_eq!(*force, field.query_category(point, category, None).unwrap());
    }
    assert_relative_eq!(all[&gravity()], gravity_force);
}
