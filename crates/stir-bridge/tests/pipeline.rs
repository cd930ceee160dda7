use std::fs;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use stir_bridge::{
    Bridge, BridgeConfig, Channel, DataProcessor, EllipsoidalCylinder, Image, ImageGeometry, IterativeReconstruction,
    ObjectiveFunction, OsmaposlReconstruction, OsspsReconstruction, Parameterized, PoissonLinearModel,
    PoissonLogLikelihoodWithLinearModelForMeanAndProjData, Prior, ProjectorsUsingMatrix, QuadraticPrior,
    RayTracingMatrix, Rim, Runnable, SetUp, Shape, TruncateToCylindricalFovProcessor,
};
use stir_engine::{ImageFile, MemoryEngine};
use tempfile::TempDir;

fn memory_bridge() -> (Rc<MemoryEngine>, Bridge) {
    let memory = Rc::new(MemoryEngine::new());
    let bridge = Bridge::without_sinks(memory.clone());
    (memory, bridge)
}

fn cylinder(bridge: &Bridge, radius: f32) -> EllipsoidalCylinder {
    let shape = EllipsoidalCylinder::new(bridge).unwrap();
    shape.set_length(100.0).unwrap();
    shape.set_radii((radius, radius)).unwrap();
    shape.set_origin([0.0, 0.0, 0.0]).unwrap();
    shape
}

#[test]
fn test_filled_image_density() {
    let (_memory, bridge) = memory_bridge();
    let mut image = Image::new(&bridge);
    image.initialise((4, 4, 4)).unwrap();
    image.fill(2.0).unwrap();

    let density = image.density().unwrap();
    assert_eq!(density.shape(), [4, 4, 4]);
    assert_eq!(density.len(), 64);
    assert!(density.iter().all(|v| v == 2.0));
    assert_eq!(density.sum(), 128.0);
}

#[test]
fn test_density_is_z_major() {
    let (_memory, bridge) = memory_bridge();
    let mut image = Image::new(&bridge);
    image.initialise(((16, 16, 2), (1.0, 1.0, 1.0))).unwrap();
    let shape = cylinder(&bridge, 4.0);
    image.add_shape(&shape, 1.0).unwrap();

    let density = image.density().unwrap();
    assert_eq!(density.shape(), [2, 16, 16]);
    assert_eq!(density[[0, 7, 7]], 1.0);
    assert_eq!(density[[1, 8, 8]], 1.0);
    assert_eq!(density[[0, 0, 0]], 0.0);
    assert_eq!(density[[1, 15, 0]], 0.0);
}

#[test]
fn test_tuple_and_scalar_initialise_agree() {
    let (_memory, bridge) = memory_bridge();
    let shape = cylinder(&bridge, 3.0);

    let mut tuple = Image::new(&bridge);
    tuple.initialise(((8, 8, 4), (2.0, 2.0, 2.0), (0.0, 0.0, 0.0))).unwrap();
    tuple.add_shape(&shape, 1.5).unwrap();

    let mut scalars = Image::new(&bridge);
    scalars.initialise_scalars(8, 8, 4, 2.0, 2.0, 2.0, 0.0, 0.0, 0.0).unwrap();
    scalars.add_shape(&shape, 1.5).unwrap();

    assert_eq!(tuple.density().unwrap(), scalars.density().unwrap());
    assert_eq!(tuple.diff_from(&scalars).unwrap(), 0.0);
}

#[test]
fn test_zero_scale_leaves_image_unchanged() {
    let (_memory, bridge) = memory_bridge();
    let mut image = Image::new(&bridge);
    image.initialise(ImageGeometry::new([8, 8, 2])).unwrap();
    image.fill(1.0).unwrap();
    let before = image.density().unwrap();

    let shape = cylinder(&bridge, 2.0);
    image.add_shape(&shape, 0.0).unwrap();
    assert_eq!(image.density().unwrap(), before);

    let unset = EllipsoidalCylinder::new(&bridge).unwrap();
    image.add_shape(&unset, 0.0).unwrap();
    assert_eq!(image.density().unwrap(), before);
    assert!(image.add_shape(&unset, 1.0).is_err());
}

#[test]
fn test_clone_is_independent() {
    let (_memory, bridge) = memory_bridge();
    let mut image = Image::new(&bridge);
    image.initialise((4, 4, 4)).unwrap();
    image.fill(2.0).unwrap();

    let mut copy = image.clone_image().unwrap();
    assert_eq!(copy.diff_from(&image).unwrap(), 0.0);
    copy.fill(3.0).unwrap();

    assert!(image.density().unwrap().iter().all(|v| v == 2.0));
    assert_eq!(image.diff_from(&copy).unwrap(), 1.0);
}

#[test]
fn test_rim_excludes_border() {
    let (_memory, bridge) = memory_bridge();
    let mut image = Image::new(&bridge);
    image.initialise((16, 16, 2)).unwrap();
    let mut other = image.clone_image().unwrap();
    let shape = cylinder(&bridge, 2.0);
    other.add_shape(&shape, 1.0).unwrap();

    image.set_rim(Rim::Full);
    assert_eq!(image.diff_from(&other).unwrap(), 1.0);
    image.set_rim(Rim::Trim(7));
    assert_eq!(image.diff_from(&other).unwrap(), 1.0);
    image.set_rim(Rim::Trim(8));
    assert!(image.diff_from(&other).is_err());
}

#[test]
fn test_image_from_file() {
    let (memory, bridge) = memory_bridge();
    memory.register_image_file("phantom.hv", ImageFile::filled([6, 5, 4], [2.0, 2.0, 3.0], [0.0; 3], 7.0));

    let loaded = Image::from_file(&bridge, "phantom.hv").unwrap();
    let density = loaded.density().unwrap();
    assert_eq!(density.shape(), [4, 5, 6]);
    assert!(density.iter().all(|v| v == 7.0));

    let mut built = Image::new(&bridge);
    built
        .initialise(((6, 5, 4), (2.0, 2.0, 3.0)))
        .unwrap();
    built.fill(7.0).unwrap();
    assert_eq!(built.diff_from(&loaded).unwrap(), 0.0);

    let err = Image::from_file(&bridge, "missing.hv").unwrap_err();
    assert_eq!(err.message(), "cannot read image file missing.hv: unknown file format");
}

#[test]
fn test_filter_truncates_to_field_of_view() {
    let (_memory, bridge) = memory_bridge();
    let mut image = Image::new(&bridge);
    image.initialise((16, 16, 2)).unwrap();
    image.fill(1.0).unwrap();

    let filter = TruncateToCylindricalFovProcessor::new(&bridge).unwrap();
    filter.apply(&mut image).unwrap();

    let density = image.density().unwrap();
    assert_eq!(density[[0, 0, 0]], 0.0);
    assert_eq!(density[[1, 15, 15]], 0.0);
    assert_eq!(density[[0, 8, 8]], 1.0);
}

/// Objective with projectors, matrix and a quadratic prior wired in
fn objective(bridge: &Bridge) -> PoissonLogLikelihoodWithLinearModelForMeanAndProjData {
    let matrix = RayTracingMatrix::new(bridge).unwrap();
    matrix.set_num_tangential_lors(2).unwrap();
    let projectors = ProjectorsUsingMatrix::new(bridge).unwrap();
    projectors.set_matrix(&matrix).unwrap();

    let prior = QuadraticPrior::new(bridge).unwrap();
    prior.set_penalisation_factor(0.5).unwrap();

    let objective = PoissonLogLikelihoodWithLinearModelForMeanAndProjData::new(bridge).unwrap();
    objective.set_input_filename("my_forward_projection.hs").unwrap();
    objective.set_max_segment_num_to_process(3).unwrap();
    objective.set_zero_seg0_end_planes(true).unwrap();
    objective.set_sensitivity_filename("sens.hv").unwrap();
    objective.set_projector_pair(&projectors).unwrap();
    objective.set_prior(&prior).unwrap();
    objective
}

#[test]
fn test_osmaposl_pipeline() {
    let dir = TempDir::new().unwrap();
    let errors = dir.path().join("errors.log");
    let progress = dir.path().join("progress.log");
    let memory = Rc::new(MemoryEngine::new());
    {
        let config = BridgeConfig::default()
            .with_sink(errors.to_string_lossy(), Channel::Error)
            .with_sink(progress.to_string_lossy(), Channel::Info);
        let bridge = Bridge::new(memory.clone(), &config).unwrap();

        let mut image = Image::new(&bridge);
        image.initialise((16, 16, 2)).unwrap();
        image.fill(1.0).unwrap();

        let objective = objective(&bridge);
        objective.set_up().unwrap();
        assert_eq!(objective.prior().unwrap().penalisation_factor().unwrap(), 0.5);
        assert_eq!(
            objective.projector_pair().unwrap().matrix().unwrap().num_tangential_lors().unwrap(),
            2
        );

        let filter = TruncateToCylindricalFovProcessor::new(&bridge).unwrap();
        let recon = OsmaposlReconstruction::new(&bridge).unwrap();
        recon.set_output_filename_prefix("est").unwrap();
        recon.set_num_subsets(2).unwrap();
        recon.set_num_subiterations(3).unwrap();
        recon.set_save_interval(2).unwrap();
        recon.set_inter_iteration_filter_interval(1).unwrap();
        recon.set_objective_function(&objective).unwrap();
        recon.set_inter_iteration_filter(&filter).unwrap();
        drop(filter);

        let err = recon.update(&mut image).unwrap_err();
        assert_eq!(err.message(), "OSMAPOSL: reconstruction has not been set up");

        recon.set_up(&image).unwrap();
        assert_eq!(recon.subiteration_num().unwrap(), 1);
        recon.update(&mut image).unwrap();
        assert_eq!(recon.subiteration_num().unwrap(), 2);

        // the filter outlives its owning facade through the link
        let density = image.density().unwrap();
        assert_eq!(density[[0, 0, 0]], 0.0);
        assert_eq!(density[[0, 8, 8]], 1.0);

        let linked = recon.inter_iteration_filter().unwrap();
        assert!(!linked.owns_handle());
        drop(linked);

        recon.reconstruct(&mut image).unwrap();
        assert_eq!(recon.subiteration_num().unwrap(), 4);

        recon.set_up(&image).unwrap();
        assert_eq!(recon.subiteration_num().unwrap(), 1);

        assert_eq!(
            recon.objective_function().unwrap().prior().unwrap().penalisation_factor().unwrap(),
            0.5
        );
    }
    assert_eq!(memory.live_handles(), 0);
    assert_eq!(memory.open_channels(), 0);

    assert_eq!(
        fs::read_to_string(&errors).unwrap(),
        "ERROR: OSMAPOSL: reconstruction has not been set up\n"
    );
    let progress = fs::read_to_string(&progress).unwrap();
    let lines: Vec<&str> = progress.lines().collect();
    assert!(lines.contains(&"INFO: OSMAPOSL: set-up complete"));
    assert!(lines.contains(&"INFO: OSMAPOSL: subiteration 1 (subset 0)"));
    assert!(lines.contains(&"INFO: OSMAPOSL: subiteration 2 (subset 1)"));
    assert!(lines.contains(&"INFO: OSMAPOSL: subiteration 3 (subset 0)"));
    assert!(lines.contains(&"INFO: saved estimate est_2"));
    assert!(lines.contains(&"INFO: saved estimate est_3"));
    assert!(!lines.contains(&"INFO: saved estimate est_1"));
}

#[test]
fn test_ossps_needs_objective() {
    let (memory, bridge) = memory_bridge();
    let mut image = Image::new(&bridge);
    image.initialise((4, 4, 4)).unwrap();
    let recon = OsspsReconstruction::new(&bridge).unwrap();
    recon.set_relaxation_parameter(2.0).unwrap();

    let err = recon.set_up(&image).unwrap_err();
    assert_eq!(err.message(), "OSSPS: no objective function set");

    let objective = objective(&bridge);
    recon.set_objective_function(&objective).unwrap();
    recon.set_num_subiterations(2).unwrap();
    recon.set_up(&image).unwrap();
    recon.reconstruct(&mut image).unwrap();
    assert_eq!(recon.subiteration_num().unwrap(), 3);

    drop((recon, objective, image));
    assert_eq!(memory.live_handles(), 0);
}

#[test]
fn test_subiteration_counter_overflow_is_reported() {
    let (memory, bridge) = memory_bridge();
    let mut image = Image::new(&bridge);
    image.initialise((4, 4, 4)).unwrap();
    let objective = objective(&bridge);
    let recon = OsmaposlReconstruction::new(&bridge).unwrap();
    recon.set_objective_function(&objective).unwrap();
    recon.set_up(&image).unwrap();

    recon.set_subiteration_num(i32::MAX).unwrap();
    let err = recon.update(&mut image).unwrap_err();
    assert!(err.message().starts_with("subiteration counter overflow"));
    assert_eq!(recon.subiteration_num().unwrap(), i32::MAX);

    drop((recon, objective, image));
    assert_eq!(memory.live_handles(), 0);
}

#[test]
fn test_borrowed_filter_keeps_owner_usable() {
    let (memory, bridge) = memory_bridge();
    let filter = TruncateToCylindricalFovProcessor::new(&bridge).unwrap();
    let recon = OsmaposlReconstruction::new(&bridge).unwrap();
    recon.set_inter_iteration_filter(&filter).unwrap();

    let linked = recon.inter_iteration_filter().unwrap();
    assert!(!linked.owns_handle());
    drop(linked);

    filter.set_strictly_less_than_radius(true).unwrap();
    assert!(filter.strictly_less_than_radius().unwrap());
    let mut image = Image::new(&bridge);
    image.initialise((16, 16, 2)).unwrap();
    image.fill(1.0).unwrap();
    filter.apply(&mut image).unwrap();
    let density = image.density().unwrap();
    assert_eq!(density[[0, 0, 0]], 0.0);
    assert_eq!(density[[1, 8, 8]], 1.0);

    drop((recon, filter, image));
    assert_eq!(memory.live_handles(), 0);
}

#[test]
fn test_borrowed_objective_keeps_owner_usable() {
    let (memory, bridge) = memory_bridge();
    let objective = objective(&bridge);
    let recon = OsmaposlReconstruction::new(&bridge).unwrap();
    recon.set_objective_function(&objective).unwrap();

    let alias = PoissonLogLikelihoodWithLinearModelForMeanAndProjData::aliasing(&objective).unwrap();
    alias.set_use_subset_sensitivities(true).unwrap();
    drop(alias);

    let linked = recon.objective_function().unwrap();
    drop(linked);

    assert!(objective.use_subset_sensitivities().unwrap());
    objective.set_up().unwrap();
    drop((recon, objective));
    assert_eq!(memory.live_handles(), 0);
}
