//! End-to-end tests of the reference engine through the raw handle API.

use pretty_assertions::assert_eq;
use stir_engine::{Engine, Handle, MemoryEngine, ALL_CHANNELS, ERROR_CHANNEL};

fn ok(engine: &MemoryEngine, handle: Handle) -> Handle {
    assert_eq!(
        engine.execution_status(handle),
        0,
        "{}",
        engine.execution_error(handle)
    );
    handle
}

fn set(engine: &MemoryEngine, object: Handle, class: &str, name: &str, value: Handle) {
    let status = engine.set_parameter(object, class, name, value);
    ok(engine, status);
    engine.delete_data_handle(status);
}

fn set_str(engine: &MemoryEngine, object: Handle, class: &str, name: &str, value: &str) {
    let boxed = engine.char_data_handle(value);
    set(engine, object, class, name, boxed);
    engine.delete_data_handle(boxed);
}

fn set_int(engine: &MemoryEngine, object: Handle, class: &str, name: &str, value: i32) {
    let boxed = engine.int_data_handle(value);
    set(engine, object, class, name, boxed);
    engine.delete_data_handle(boxed);
}

fn get_int(engine: &MemoryEngine, object: Handle, class: &str, name: &str) -> i32 {
    let value = ok(engine, engine.parameter(object, class, name));
    let v = engine.int_data_from_handle(value);
    engine.delete_data_handle(value);
    v
}

struct Pipeline {
    matrix: Handle,
    projectors: Handle,
    prior: Handle,
    objective: Handle,
    filter: Handle,
    recon: Handle,
    voxels: Handle,
    image: Handle,
}

fn build(engine: &MemoryEngine) -> Pipeline {
    let matrix = ok(engine, engine.new_object("RayTracingMatrix"));
    set_int(engine, matrix, "RayTracingMatrix", "num_tangential_LORs", 2);

    let projectors = ok(engine, engine.new_object("ProjectorsUsingMatrix"));
    set(engine, projectors, "ProjectorsUsingMatrix", "matrix_type", matrix);

    let prior = ok(engine, engine.new_object("QuadraticPrior"));
    let factor = engine.float_data_handle(0.5);
    set(engine, prior, "GeneralisedPrior", "penalisation_factor", factor);
    engine.delete_data_handle(factor);

    let objective = ok(
        engine,
        engine.new_object("PoissonLogLikelihoodWithLinearModelForMeanAndProjData"),
    );
    set(engine, objective, "GeneralisedObjectiveFunction", "prior", prior);
    set(
        engine,
        objective,
        "PoissonLogLikelihoodWithLinearModelForMeanAndProjData",
        "projector_pair_type",
        projectors,
    );

    let filter = ok(engine, engine.new_object("TruncateToCylindricalFOVImageProcessor"));

    let recon = ok(engine, engine.new_reconstruction("OSMAPOSL", ""));
    set(engine, recon, "IterativeReconstruction", "objective_function", objective);
    set(engine, recon, "IterativeReconstruction", "inter_iteration_filter_type", filter);
    set_int(engine, recon, "IterativeReconstruction", "num_subsets", 2);
    set_int(engine, recon, "IterativeReconstruction", "num_subiterations", 4);
    set_int(engine, recon, "IterativeReconstruction", "inter_iteration_filter_interval", 2);
    set_str(engine, recon, "Reconstruction", "output_filename_prefix", "est");

    let voxels = ok(engine, engine.voxels_3df([8, 8, 2], [1.0; 3], [0.0; 3]));
    let image = ok(engine, engine.image_from_voxels(voxels));

    Pipeline {
        matrix,
        projectors,
        prior,
        objective,
        filter,
        recon,
        voxels,
        image,
    }
}

fn teardown(engine: &MemoryEngine, p: Pipeline) {
    for (handle, base) in [
        (p.recon, "Reconstruction"),
        (p.filter, "DataProcessor"),
        (p.objective, "ObjectiveFunction"),
        (p.prior, "Prior"),
        (p.projectors, "Projectors"),
        (p.matrix, "ProjMatrix"),
        (p.image, "Image"),
        (p.voxels, "Voxels"),
    ] {
        let status = engine.delete_object(handle, base);
        ok(engine, status);
        engine.delete_data_handle(status);
    }
}

#[test]
fn test_reconstruction_stages() {
    let engine = MemoryEngine::new();
    let p = build(&engine);

    let early = engine.update_reconstruction(p.recon, p.image);
    assert_eq!(engine.execution_status(early), 1);
    assert!(engine.execution_error(early).contains("has not been set up"));
    engine.delete_data_handle(early);

    let status = ok(&engine, engine.setup_reconstruction(p.recon, p.image));
    engine.delete_data_handle(status);
    let status = ok(&engine, engine.update_reconstruction(p.recon, p.image));
    engine.delete_data_handle(status);
    assert_eq!(get_int(&engine, p.recon, "IterativeReconstruction", "subiteration_num"), 2);

    let status = ok(&engine, engine.run_reconstruction(p.recon, p.image));
    engine.delete_data_handle(status);
    assert_eq!(get_int(&engine, p.recon, "IterativeReconstruction", "subiteration_num"), 5);

    let status = ok(&engine, engine.setup_reconstruction(p.recon, p.image));
    engine.delete_data_handle(status);
    assert_eq!(get_int(&engine, p.recon, "IterativeReconstruction", "subiteration_num"), 1);

    teardown(&engine, p);
    assert_eq!(engine.live_handles(), 0);
}

#[test]
fn test_inter_iteration_filter_truncates_image() {
    let engine = MemoryEngine::new();
    let p = build(&engine);
    let status = ok(&engine, engine.fill_image(p.image, 1.0));
    engine.delete_data_handle(status);
    let status = ok(&engine, engine.setup_reconstruction(p.recon, p.image));
    engine.delete_data_handle(status);
    let status = ok(&engine, engine.run_reconstruction(p.recon, p.image));
    engine.delete_data_handle(status);

    let mut data = vec![0.0; 128];
    let status = ok(&engine, engine.image_data(p.image, &mut data));
    engine.delete_data_handle(status);
    assert_eq!(data[0], 0.0);
    assert_eq!(data[4 * 8 + 4], 1.0);

    teardown(&engine, p);
}

#[test]
fn test_linked_parameters_alias_the_same_object() {
    let engine = MemoryEngine::new();
    let p = build(&engine);

    let filter = ok(
        &engine,
        engine.parameter(p.recon, "IterativeReconstruction", "inter_iteration_filter_type"),
    );
    set_str(
        &engine,
        filter,
        "TruncateToCylindricalFOVImageProcessor",
        "strictly_less_than_radius",
        "true",
    );
    engine.delete_data_handle(filter);

    assert_eq!(
        get_int(
            &engine,
            p.filter,
            "TruncateToCylindricalFOVImageProcessor",
            "strictly_less_than_radius"
        ),
        1
    );
    teardown(&engine, p);
}

#[test]
fn test_parameter_file_and_error_channel() {
    let dir = tempfile::tempdir().unwrap();
    let par = dir.path().join("ossps.par");
    std::fs::write(
        &par,
        "OSSPSParameters :=\n\
         number of subsets := 3\n\
         relaxation parameter := 0.5\n\
         END :=\n",
    )
    .unwrap();
    let log = dir.path().join("errors.log");

    let engine = MemoryEngine::new();
    let writer = ok(&engine, engine.new_text_writer(log.to_str().unwrap()));
    let status = ok(&engine, engine.open_channel(ERROR_CHANNEL, writer));
    engine.delete_data_handle(status);

    let recon = ok(&engine, engine.new_reconstruction("OSSPS", par.to_str().unwrap()));
    assert_eq!(get_int(&engine, recon, "IterativeReconstruction", "num_subsets"), 3);
    let relaxation = ok(&engine, engine.parameter(recon, "OSSPS", "relaxation_parameter"));
    assert_eq!(engine.float_data_from_handle(relaxation), 0.5);
    engine.delete_data_handle(relaxation);

    let bad = engine.parameter(recon, "OSSPS", "MAP_model");
    assert_eq!(engine.execution_status(bad), 1);
    engine.delete_data_handle(bad);

    let status = ok(&engine, engine.close_channel(ERROR_CHANNEL, writer));
    engine.delete_data_handle(status);
    let not_open = engine.close_channel(ALL_CHANNELS, writer);
    assert_eq!(engine.execution_status(not_open), 1);
    engine.delete_data_handle(not_open);
    engine.delete_text_writer(writer);

    let status = ok(&engine, engine.delete_object(recon, "Reconstruction"));
    engine.delete_data_handle(status);

    let logged = std::fs::read_to_string(&log).unwrap();
    assert_eq!(logged, "ERROR: parameter MAP_model not found in OSSPS\n");
    assert_eq!(engine.live_handles(), 0);
    assert_eq!(engine.open_channels(), 0);
}
