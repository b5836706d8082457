mod common;

use cgmath::{InnerSpace, Point3, Transform, Vector3};
use model_viewer::{
    ImportError,
    data_structures::{model::Material, texture::TextureSource},
    import_scene,
    resources::{
        importer::{extract_mesh, extract_model, mesh_order},
        scene::{SourceMaterial, SourceScene},
        texture::ChannelHint,
    },
};

use common::{RecordingResolver, node, scene, scratch_dir, textured_material, triangle};

#[test]
fn root_meshes_come_before_child_meshes() {
    let scene = scene(
        vec![node("root", &[0, 1], &[1]), node("child", &[2], &[])],
        vec![
            triangle("a", 1.0, 0.0, None),
            triangle("b", 1.0, 1.0, None),
            triangle("c", 1.0, 2.0, None),
        ],
        vec![],
    );
    let model = extract_model(&scene, &mut RecordingResolver::new()).unwrap();
    let names: Vec<&str> = model.meshes.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["a", "b", "c"]);
}

#[test]
fn siblings_are_visited_in_declaration_order() {
    // root -> [left -> [left.leaf], right]
    let scene = scene(
        vec![
            node("root", &[], &[1, 3]),
            node("left", &[0], &[2]),
            node("left.leaf", &[1], &[]),
            node("right", &[2], &[]),
        ],
        vec![],
        vec![],
    );
    assert_eq!(mesh_order(&scene, 0), vec![0, 1, 2]);
}

#[test]
fn deep_hierarchies_do_not_overflow_the_stack() {
    let depth = 200_000;
    let nodes = (0..depth)
        .map(|i| {
            let children: Vec<usize> = if i + 1 < depth { vec![i + 1] } else { vec![] };
            node("link", &[0], &children)
        })
        .collect();
    let scene = scene(nodes, vec![triangle("t", 1.0, 0.0, None)], vec![]);
    assert_eq!(mesh_order(&scene, 0).len(), depth);
}

#[test]
fn nodes_reachable_twice_are_visited_once() {
    let scene = scene(
        vec![node("root", &[0], &[1, 1]), node("loop", &[1], &[0])],
        vec![triangle("a", 1.0, 0.0, None), triangle("b", 1.0, 0.0, None)],
        vec![],
    );
    assert_eq!(mesh_order(&scene, 0), vec![0, 1]);
}

#[test]
fn textured_black_diffuse_is_corrected_to_white() {
    let scene = scene(
        vec![node("root", &[0], &[])],
        vec![triangle("a", 1.0, 0.0, Some(0))],
        vec![textured_material("wood.png", [0.0, 0.0, 0.0])],
    );
    let model = extract_model(&scene, &mut RecordingResolver::new()).unwrap();
    let material = &model.meshes[0].material;
    assert!(material.diffuse_texture.is_some());
    assert_eq!(material.diffuse_color, Vector3::new(1.0, 1.0, 1.0));
}

#[test]
fn missing_properties_fall_back_to_defaults() {
    let scene = scene(
        vec![node("root", &[0, 1], &[])],
        vec![triangle("plain", 1.0, 0.0, Some(0)), triangle("no material", 1.0, 0.0, None)],
        vec![SourceMaterial {
            name: "bare".to_string(),
            ..Default::default()
        }],
    );
    let model = extract_model(&scene, &mut RecordingResolver::new()).unwrap();
    for mesh in &model.meshes {
        assert_eq!(mesh.material, Material::default());
        assert_eq!(mesh.material.shininess, 25.0);
        assert_eq!(mesh.material.shininess_strength, 1.0);
        assert_eq!(mesh.material.diffuse_color, Vector3::new(1.0, 1.0, 1.0));
    }
}

#[test]
fn material_index_out_of_range_uses_the_default_material() {
    let scene = scene(
        vec![node("root", &[0], &[])],
        vec![triangle("a", 1.0, 0.0, Some(7))],
        vec![],
    );
    let model = extract_model(&scene, &mut RecordingResolver::new()).unwrap();
    assert_eq!(model.meshes[0].material, Material::default());
}

#[test]
fn diffuse_maps_keep_alpha_and_specular_maps_do_not() {
    let scene = scene(
        vec![node("root", &[0], &[])],
        vec![triangle("a", 1.0, 0.0, Some(0))],
        vec![SourceMaterial {
            specular_texture: Some(model_viewer::data_structures::texture::TextureRef::file(
                "shine.png",
            )),
            ..textured_material("wood.png", [0.5, 0.5, 0.5])
        }],
    );
    let mut textures = RecordingResolver::new();
    let model = extract_model(&scene, &mut textures).unwrap();
    assert_eq!(
        textures.lookups,
        vec![
            ("wood.png".to_string(), ChannelHint::Rgba),
            ("shine.png".to_string(), ChannelHint::Rgb),
        ]
    );
    let material = &model.meshes[0].material;
    assert_eq!(textures.key_of(material.diffuse_texture), "wood.png");
    assert_eq!(textures.key_of(material.specular_texture), "shine.png");
}

#[test]
fn a_material_is_resolved_once_per_model() {
    let scene = scene(
        vec![node("root", &[0, 1, 2], &[])],
        vec![
            triangle("a", 1.0, 0.0, Some(0)),
            triangle("b", 1.0, 0.0, Some(0)),
            triangle("c", 1.0, 0.0, Some(0)),
        ],
        vec![textured_material("wood.png", [1.0, 1.0, 1.0])],
    );
    let mut textures = RecordingResolver::new();
    let model = extract_model(&scene, &mut textures).unwrap();
    assert_eq!(textures.lookups.len(), 1);
    assert!(model.meshes.iter().all(|m| m.material == model.meshes[0].material));
}

#[test]
fn materials_sharing_a_texture_share_the_handle() {
    let scene = scene(
        vec![node("root", &[0, 1], &[])],
        vec![triangle("a", 1.0, 0.0, Some(0)), triangle("b", 1.0, 0.0, Some(1))],
        vec![
            textured_material("wood.png", [1.0, 1.0, 1.0]),
            textured_material("wood.png", [0.5, 0.5, 0.5]),
        ],
    );
    let mut textures = RecordingResolver::new();
    let model = extract_model(&scene, &mut textures).unwrap();
    assert_eq!(textures.lookups.len(), 2);
    assert_eq!(textures.loads, vec!["wood.png".to_string()]);
    assert_eq!(
        model.meshes[0].material.diffuse_texture,
        model.meshes[1].material.diffuse_texture
    );
}

#[test]
fn broken_textures_leave_the_slot_empty() {
    let scene = scene(
        vec![node("root", &[0], &[])],
        vec![triangle("a", 1.0, 0.0, Some(0))],
        vec![textured_material("broken.png", [0.0, 0.0, 0.0])],
    );
    let mut textures = RecordingResolver::with_broken(&["broken.png"]);
    let model = extract_model(&scene, &mut textures).unwrap();
    let material = &model.meshes[0].material;
    assert_eq!(material.diffuse_texture, None);
    // Untextured, so black stays black
    assert_eq!(material.diffuse_color, Vector3::new(0.0, 0.0, 0.0));
}

#[test]
fn partial_triangles_and_bad_indices_are_dropped() {
    let mut mesh = triangle("a", 1.0, 0.0, None);
    mesh.indices = vec![0, 1, 2, 2, 1, 9, 0, 2];
    let data = extract_mesh(&mesh, Material::default()).unwrap();
    assert_eq!(data.indices, vec![0, 1, 2]);
    assert_eq!(data.vertices.len(), 3);

    mesh.indices = vec![0, 1, 5];
    assert!(extract_mesh(&mesh, Material::default()).is_none());
}

#[test]
fn missing_attributes_are_zero_filled() {
    let mut mesh = triangle("a", 1.0, 0.0, None);
    mesh.normals.clear();
    mesh.tex_coords = None;
    let data = extract_mesh(&mesh, Material::default()).unwrap();
    assert!(data.vertices.iter().all(|v| v.normal == [0.0; 3]));
    assert!(data.vertices.iter().all(|v| v.tex_coords == [0.0; 2]));
}

#[test]
fn scenes_without_a_usable_root_are_rejected() {
    let mut no_root = scene(vec![node("root", &[0], &[])], vec![triangle("a", 1.0, 0.0, None)], vec![]);
    no_root.root = None;
    assert!(matches!(
        extract_model(&no_root, &mut RecordingResolver::new()),
        Err(ImportError::MissingRoot(_))
    ));

    let mut dangling = no_root.clone();
    dangling.root = Some(3);
    assert!(matches!(
        extract_model(&dangling, &mut RecordingResolver::new()),
        Err(ImportError::MissingRoot(_))
    ));
}

#[test]
fn incomplete_scenes_are_rejected() {
    let mut scene = scene(vec![node("root", &[0], &[])], vec![triangle("a", 1.0, 0.0, None)], vec![]);
    scene.incomplete = true;
    assert!(matches!(
        extract_model(&scene, &mut RecordingResolver::new()),
        Err(ImportError::IncompleteScene(_))
    ));
}

#[test]
fn scenes_without_geometry_are_degenerate() {
    let mut empty = triangle("empty", 1.0, 0.0, None);
    empty.indices.clear();
    let scene = scene(vec![node("root", &[0], &[])], vec![empty], vec![]);
    assert!(matches!(
        extract_model(&scene, &mut RecordingResolver::new()),
        Err(ImportError::DegenerateGeometry { .. })
    ));

    let mut point = triangle("point", 1.0, 0.0, None);
    point.positions = vec![[1.0, 2.0, 3.0]; 3];
    let scene = SourceScene {
        meshes: vec![point],
        ..scene
    };
    assert!(matches!(
        extract_model(&scene, &mut RecordingResolver::new()),
        Err(ImportError::DegenerateGeometry { .. })
    ));
}

#[test]
fn unsupported_files_are_rejected_before_reading() {
    let err = import_scene("scene.fbx", &mut RecordingResolver::new()).unwrap_err();
    assert!(matches!(err, ImportError::UnsupportedFormat(_)));
}

#[test]
fn unreadable_files_are_malformed() {
    let dir = scratch_dir("unreadable");
    let err = import_scene(dir.join("missing.gltf"), &mut RecordingResolver::new()).unwrap_err();
    assert!(matches!(err, ImportError::Malformed { .. }));
}

const OBJ: &str = "\
mtllib scene.mtl
o first
v 0 0 0
v 4 0 0
v 0 2 0
vt 0 0
vt 1 0
vt 0 1
vn 0 0 1
usemtl painted
f 1/1/1 2/2/1 3/3/1
o second
v 0 0 -2
v 4 0 -2
v 0 2 -2
usemtl painted
f 4/1/1 5/2/1 6/3/1
";

const MTL: &str = "\
newmtl painted
Kd 0 0 0
Ks 0.5 0.5 0.5
Ns 40
map_Kd wood.png
";

#[test]
fn obj_files_are_imported_with_their_materials() {
    let dir = scratch_dir("obj");
    std::fs::write(dir.join("scene.obj"), OBJ).unwrap();
    std::fs::write(dir.join("scene.mtl"), MTL).unwrap();

    let mut textures = RecordingResolver::new();
    let model = import_scene(dir.join("scene.obj"), &mut textures).unwrap();

    let names: Vec<&str> = model.meshes.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["first", "second"]);

    let wood = dir.join("wood.png").to_string_lossy().into_owned();
    assert_eq!(textures.lookups, vec![(wood.clone(), ChannelHint::Rgba)]);

    let material = &model.meshes[0].material;
    assert_eq!(textures.key_of(material.diffuse_texture), wood);
    assert_eq!(material.diffuse_color, Vector3::new(1.0, 1.0, 1.0));
    assert_eq!(material.specular_color, Vector3::new(0.5, 0.5, 0.5));
    assert_eq!(material.shininess, 40.0);

    // V is flipped to a top-left origin
    let top = model.meshes[0]
        .vertices
        .iter()
        .find(|v| v.position == [0.0, 2.0, 0.0])
        .unwrap();
    assert_eq!(top.tex_coords, [0.0, 0.0]);

    // 4 x 2 x 2 box: scaled by 2.5, centred on X and Z, resting on y = 0
    let corner = model.transform.transform_point(Point3::new(0.0, 0.0, 0.0));
    assert!((corner - Point3::new(-5.0, 0.0, 2.5)).magnitude() < 1e-5);
}

#[test]
fn obj_without_its_material_library_uses_defaults() {
    let dir = scratch_dir("obj-no-mtl");
    std::fs::write(dir.join("scene.obj"), OBJ).unwrap();

    let mut textures = RecordingResolver::new();
    let model = import_scene(dir.join("scene.obj"), &mut textures).unwrap();
    assert_eq!(model.meshes.len(), 2);
    assert!(textures.lookups.is_empty());
    assert!(model.meshes.iter().all(|m| m.material == Material::default()));
}

/// One triangle (0,0,0) (2,0,0) (0,4,1), referenced by a root node and its child.
const GLTF: &str = r#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [{ "nodes": [0] }],
  "nodes": [
    { "name": "root", "mesh": 0, "children": [1] },
    { "name": "child", "mesh": 0 }
  ],
  "meshes": [{
    "name": "tri",
    "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }]
  }],
  "materials": [{ "name": "red", "pbrMetallicRoughness": { "baseColorFactor": [1.0, 0.0, 0.0, 1.0] } }],
  "buffers": [{
    "byteLength": 44,
    "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAAAAQAAAAAAAAAAAAAAAAAAAgEAAAIA/AAABAAIAAAA="
  }],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
    { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
  ],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0, 0, 0], "max": [2, 4, 1] },
    { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
  ]
}"#;

#[test]
fn gltf_hierarchies_are_flattened() {
    let dir = scratch_dir("gltf");
    let path = dir.join("triangle.gltf");
    std::fs::write(&path, GLTF).unwrap();

    let scene = SourceScene::open(&path).unwrap();
    assert_eq!(scene.root_node().unwrap().name, "root");

    let model = import_scene(&path, &mut RecordingResolver::new()).unwrap();
    assert_eq!(model.meshes.len(), 2);
    assert_eq!(model.meshes[0].indices, vec![0, 1, 2]);
    assert_eq!(model.meshes[0].material.diffuse_color, Vector3::new(1.0, 0.0, 0.0));
    assert_eq!(model.bounds.extents(), Vector3::new(2.0, 4.0, 1.0));

    let top = model.transform.transform_point(Point3::new(0.0, 4.0, 0.5));
    assert!((top - Point3::new(-2.5, 10.0, 0.0)).magnitude() < 1e-5);
}

/// The triangle of [`GLTF`] with two materials. Image 0 is a file next to the scene,
/// image 1 a PNG signature stored in a buffer view and image 2 a data URI.
const TEXTURED_GLTF: &str = r#"{
  "asset": { "version": "2.0" },
  "extensionsUsed": ["KHR_materials_specular"],
  "scene": 0,
  "scenes": [{ "nodes": [0] }],
  "nodes": [{ "name": "root", "mesh": 0 }],
  "meshes": [{
    "name": "textured",
    "primitives": [
      { "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 },
      { "attributes": { "POSITION": 0 }, "indices": 1, "material": 1 }
    ]
  }],
  "materials": [
    {
      "name": "shiny",
      "pbrMetallicRoughness": {
        "baseColorFactor": [0.5, 0.25, 1.0, 1.0],
        "baseColorTexture": { "index": 0 }
      },
      "extensions": {
        "KHR_materials_specular": {
          "specularFactor": 0.5,
          "specularColorFactor": [0.25, 0.5, 0.75],
          "specularColorTexture": { "index": 1 }
        }
      }
    },
    {
      "name": "inline",
      "pbrMetallicRoughness": {
        "baseColorFactor": [0.0, 0.5, 0.0, 1.0],
        "baseColorTexture": { "index": 2 }
      }
    }
  ],
  "textures": [{ "source": 0 }, { "source": 1 }, { "source": 2 }],
  "images": [
    { "uri": "textures/wood.png" },
    { "bufferView": 2, "mimeType": "image/png" },
    { "uri": "data:image/png;base64,iVBORw0KGgo=" }
  ],
  "buffers": [{
    "byteLength": 52,
    "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAAAAQAAAAAAAAAAAAAAAAAAAgEAAAIA/AAABAAIAAACJUE5HDQoaCg=="
  }],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
    { "buffer": 0, "byteOffset": 36, "byteLength": 6 },
    { "buffer": 0, "byteOffset": 44, "byteLength": 8 }
  ],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0, 0, 0], "max": [2, 4, 1] },
    { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
  ]
}"#;

#[test]
fn gltf_images_are_located_by_their_source() {
    let dir = scratch_dir("gltf-textures");
    let path = dir.join("textured.gltf");
    std::fs::write(&path, TEXTURED_GLTF).unwrap();

    let scene = SourceScene::open(&path).unwrap();
    let specular = scene.materials[0].specular_texture.as_ref().unwrap();
    match &specular.source {
        TextureSource::Embedded(bytes) => assert_eq!(&bytes[..], b"\x89PNG\r\n\x1a\n"),
        other => panic!("expected embedded bytes, got {other:?}"),
    }
    assert!(scene.materials[1].diffuse_texture.is_none());

    let mut textures = RecordingResolver::new();
    let model = import_scene(&path, &mut textures).unwrap();
    let wood = dir.join("textures/wood.png").to_string_lossy().into_owned();
    let embedded = format!("{}#image1", path.display());
    assert_eq!(
        textures.lookups,
        vec![(wood.clone(), ChannelHint::Rgba), (embedded.clone(), ChannelHint::Rgb)]
    );

    let shiny = &model.meshes[0].material;
    assert_eq!(textures.key_of(shiny.diffuse_texture), wood);
    assert_eq!(textures.key_of(shiny.specular_texture), embedded);
    assert_eq!(shiny.diffuse_color, Vector3::new(0.5, 0.25, 1.0));
    assert_eq!(shiny.specular_color, Vector3::new(0.25, 0.5, 0.75));
    assert_eq!(shiny.shininess_strength, 0.5);
    assert_eq!(shiny.shininess, Material::DEFAULT_SHININESS);

    // The data URI image is skipped, so only the factors remain
    let inline = &model.meshes[1].material;
    assert_eq!(inline.diffuse_texture, None);
    assert_eq!(inline.specular_texture, None);
    assert_eq!(inline.diffuse_color, Vector3::new(0.0, 0.5, 0.0));
    assert_eq!(inline.specular_color, Material::default().specular_color);
    assert_eq!(inline.shininess_strength, Material::DEFAULT_SHININESS_STRENGTH);
}

#[test]
fn gltf_primitives_with_unreadable_positions_make_the_scene_incomplete() {
    // Four positions do not fit in the 36-byte view
    let overrun = GLTF.replace(r#""count": 3, "type": "VEC3""#, r#""count": 4, "type": "VEC3""#);
    assert_ne!(overrun, GLTF);
    let dir = scratch_dir("gltf-overrun");
    let path = dir.join("overrun.gltf");
    std::fs::write(&path, overrun).unwrap();

    assert!(SourceScene::open(&path).unwrap().incomplete);
    let err = import_scene(&path, &mut RecordingResolver::new()).unwrap_err();
    assert!(matches!(err, ImportError::IncompleteScene(_)));
}

/// A triangle with a far-away point element and a line element.
const OBJ_WITH_POINTS_AND_LINES: &str = "\
v 0 0 0
v 4 0 0
v 0 2 0
v 100 100 100
v -50 0 0
f 1 2 3
p 4
l 1 5
";

#[test]
fn obj_points_and_lines_are_ignored() {
    let dir = scratch_dir("obj-points-lines");
    let path = dir.join("stray.obj");
    std::fs::write(&path, OBJ_WITH_POINTS_AND_LINES).unwrap();

    let model = import_scene(&path, &mut RecordingResolver::new()).unwrap();
    assert_eq!(model.meshes.len(), 1);
    assert_eq!(model.meshes[0].indices.len(), 3);
    assert_eq!(model.bounds.extents(), Vector3::new(4.0, 2.0, 0.0));
}
