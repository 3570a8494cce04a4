//! Materials and Properties extension

use std::io::Cursor;

use lib3mf_core::validator::validate_multi_properties;
use lib3mf_core::{
    BlendMethod, Color, Error, Model, ParserConfig, Resource, TileStyle, WarningCode,
};

use crate::common::{
    MATERIAL_NS, MODEL_REL, PRODUCTION_NS, PackageBuilder, TEXTURE_REL, model_xml, read_package,
    read_xml,
};

const TEXTURE: &str = "/3D/Textures/checker.png";

fn material_model() -> String {
    model_xml(
        &[("m", MATERIAL_NS)],
        r##"<resources>
    <basematerials id="1">
      <base name="PLA white" displaycolor="#FFFFFF"/>
      <base name="PLA black" displaycolor="#000000"/>
    </basematerials>
    <m:colorgroup id="2">
      <m:color color="#FF0000"/>
      <m:color color="#00FF00"/>
      <m:color color="#0000FF80"/>
    </m:colorgroup>
    <m:texture2d id="3" path="/3D/Textures/checker.png" contenttype="image/png" tilestyleu="mirror" filter="nearest"/>
    <m:texture2dgroup id="4" texid="3">
      <m:tex2coord u="0" v="0"/>
      <m:tex2coord u="1" v="0"/>
      <m:tex2coord u="0" v="1"/>
    </m:texture2dgroup>
    <m:compositematerials id="5" matid="1" matindices="0 1">
      <m:composite values="0.25 0.75"/>
    </m:compositematerials>
    <m:multiproperties id="6" pids="1 2" blendmethods="multiply">
      <m:multi pindices="0 1"/>
      <m:multi pindices="1 2"/>
    </m:multiproperties>
    <object id="7" type="model" pid="1" pindex="0">
      <mesh>
        <vertices>
          <vertex x="0" y="0" z="0"/>
          <vertex x="10" y="0" z="0"/>
          <vertex x="0" y="10" z="0"/>
          <vertex x="0" y="0" z="10"/>
        </vertices>
        <triangles>
          <triangle v1="0" v2="2" v3="1" pid="2" p1="0" p2="1" p3="2"/>
          <triangle v1="0" v2="1" v3="3" pid="4" p1="0" p2="1" p3="2"/>
          <triangle v1="1" v2="2" v3="3" pid="5" p1="0"/>
          <triangle v1="2" v2="0" v3="3" pid="6" p1="1"/>
        </triangles>
      </mesh>
    </object>
  </resources>
  <build><item objectid="7"/></build>"##,
    )
}

fn material_package() -> Vec<u8> {
    PackageBuilder::new(&material_model())
        .part(TEXTURE, [0x89, b'P', b'N', b'G'])
        .root_relationship(TEXTURE, TEXTURE_REL)
        .build()
}

#[test]
fn test_read_every_property_group() {
    let (model, warnings) = read_package(material_package(), ParserConfig::default());
    let model = model.unwrap();
    assert!(warnings.is_empty());
    assert_eq!(model.resource_count(), 7);

    let part = model.root_part();
    let Some(Resource::BaseMaterials(base)) = model.find_resource(part, 1) else {
        panic!("expected base materials");
    };
    assert_eq!(base.materials.get_by_index(1).unwrap().name, "PLA black");

    let Some(Resource::Colors(colors)) = model.find_resource(part, 2) else {
        panic!("expected a color group");
    };
    assert_eq!(colors.colors.get_by_index(2), Some(&Color::rgba(0, 0, 255, 128)));

    let Some(Resource::Texture2D(texture)) = model.find_resource(part, 3) else {
        panic!("expected a texture");
    };
    assert_eq!(texture.tile_style_u, TileStyle::Mirror);
    assert_eq!(texture.tile_style_v, TileStyle::Wrap);
    assert!(model.find_attachment(TEXTURE).unwrap().is_loaded());

    let Some(Resource::CompositeMaterials(composite)) = model.find_resource(part, 5) else {
        panic!("expected composite materials");
    };
    assert_eq!(composite.material_indices, vec![0, 1]);

    let Some(Resource::MultiProperties(multi)) = model.find_resource(part, 6) else {
        panic!("expected multi properties");
    };
    assert_eq!(multi.layers, vec![1, 2]);
    assert_eq!(multi.blend_method(1), Some(BlendMethod::Multiply));
}

#[test]
fn test_triangles_reference_each_group() {
    let (model, _) = read_package(material_package(), ParserConfig::default());
    let model = model.unwrap();
    let part = model.root_part();
    let mesh = &model.find_mesh_object(part, 7).unwrap().mesh;

    for (face, group) in [(0, 2), (1, 4), (2, 5), (3, 6)] {
        let handle = model.find_package_resource_id(part, group).unwrap();
        assert_eq!(mesh.triangle_properties(face).unwrap().resource(), Some(handle));
    }
    assert!(mesh.triangle_properties(2).unwrap().is_flat());

    let base = model.find_package_resource_id(part, 1).unwrap();
    assert_eq!(mesh.default_properties().unwrap().resource(), Some(base));
}

#[test]
fn test_property_groups_survive_rewrite() {
    let model = Model::from_reader(Cursor::new(material_package())).unwrap();
    let bytes = model.to_writer(Cursor::new(Vec::new())).unwrap().into_inner();
    let reread = Model::from_reader(Cursor::new(bytes)).unwrap();

    assert_eq!(reread.resource_count(), model.resource_count());
    for ((_, _, before), (_, _, after)) in model.resources().zip(reread.resources()) {
        match (before, after) {
            (Resource::Mesh(a), Resource::Mesh(b)) => {
                assert_eq!(a.mesh.vertices, b.mesh.vertices);
                assert_eq!(a.mesh.triangles, b.mesh.triangles);
            }
            (a, b) => assert_eq!(a, b),
        }
    }
    assert_eq!(
        reread.find_attachment(TEXTURE).unwrap().data(),
        Some(&[0x89, b'P', b'N', b'G'][..])
    );
}

#[test]
fn test_multi_properties_with_two_color_layers() {
    let xml = material_model().replace("pids=\"1 2\"", "pids=\"2 2\"");
    let (model, _) = read_xml(&xml, ParserConfig::default());
    assert!(matches!(model, Err(Error::InvalidModel(_))));
}

#[test]
fn test_multi_properties_layer_must_be_a_property_group() {
    let xml = material_model().replace("pids=\"1 2\"", "pids=\"1 3\"");
    let (model, _) = read_xml(&xml, ParserConfig::default());
    assert!(matches!(model, Err(Error::ResourceTypeMismatch { id: 3, .. })));
}

#[test]
fn test_multi_index_out_of_layer_range() {
    let xml = material_model().replace("pindices=\"1 2\"", "pindices=\"1 3\"");
    let (model, _) = read_xml(&xml, ParserConfig::default());
    assert!(matches!(
        model,
        Err(Error::PropertyIndexOutOfRange {
            group: 2,
            index: 3,
            count: 3
        })
    ));
}

#[test]
fn test_validate_multi_properties_directly() {
    let (model, _) = read_xml(&material_model(), ParserConfig::default());
    let model = model.unwrap();
    let handle = model.find_package_resource_id(model.root_part(), 6).unwrap();
    let Some(Resource::MultiProperties(group)) = model.resource(handle) else {
        panic!("expected multi properties");
    };
    assert!(validate_multi_properties(&model, handle, group).is_ok());
}

#[test]
fn test_invalid_blend_method_falls_back_to_mix() {
    let xml = material_model().replace("blendmethods=\"multiply\"", "blendmethods=\"screen\"");
    let (model, warnings) = read_xml(&xml, ParserConfig::default());
    let model = model.unwrap();
    let Some(Resource::MultiProperties(multi)) = model.find_resource(model.root_part(), 6) else {
        panic!("expected multi properties");
    };
    assert_eq!(multi.blend_method(1), Some(BlendMethod::Mix));
    assert_eq!(warnings[0].code, WarningCode::InvalidOptionalValue);
}

#[test]
fn test_property_group_in_linked_part() {
    let root = model_xml(
        &[("p", PRODUCTION_NS)],
        r#"<resources>
    <object id="1" type="model">
      <components><component objectid="2" p:path="/3D/colored.model"/></components>
    </object>
  </resources>
  <build><item objectid="1"/></build>"#,
    );
    let part = model_xml(
        &[("m", MATERIAL_NS)],
        r##"<resources>
    <m:colorgroup id="1"><m:color color="#FF0000"/></m:colorgroup>
    <object id="2" type="model" pid="1" pindex="0">
      <mesh>
        <vertices>
          <vertex x="0" y="0" z="0"/>
          <vertex x="10" y="0" z="0"/>
          <vertex x="0" y="10" z="0"/>
        </vertices>
        <triangles><triangle v1="0" v2="1" v3="2"/></triangles>
      </mesh>
    </object>
  </resources>"##,
    );
    let data = PackageBuilder::new(&root)
        .part("/3D/colored.model", part)
        .root_relationship("/3D/colored.model", MODEL_REL)
        .build();
    let (model, _) = read_package(data, ParserConfig::default());
    let model = model.unwrap();

    let group = model.find_package_resource_id("/3D/colored.model", 1).unwrap();
    let local = model.find_package_resource_id(model.root_part(), 1).unwrap();
    assert_ne!(group, local);

    let mesh = &model.find_mesh_object("/3D/colored.model", 2).unwrap().mesh;
    assert_eq!(mesh.triangle_properties(0).unwrap().resource(), Some(group));
}
