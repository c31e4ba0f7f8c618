//! End-to-end tests through the public API: derived records saved to a
//! directory on disk and loaded back in a fresh context.

use std::collections::{BTreeMap, HashMap};

use parcel::{DirStore, Parcel, ParcelError, Persist, Ref};

#[derive(Debug, Default, PartialEq, Persist)]
pub struct Texture {
    pub file: String,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Default, PartialEq, Persist)]
pub struct Material {
    pub name: String,
    pub tint: [f32; 3],
    pub texture: Option<Ref<Texture>>,
}

#[derive(Debug, Default, Persist)]
#[parcel(post_construct = "on_construct", post_load = "on_load")]
pub struct Scene {
    pub title: String,
    pub materials: Vec<Ref<Material>>,
    pub layers: BTreeMap<u32, String>,
    pub tags: HashMap<String, bool>,
    #[parcel(skip)]
    pub scratch: String,
    constructed: bool,
    material_count: usize,
}

impl Scene {
    fn on_construct(&mut self) {
        self.constructed = true;
    }

    fn on_load(&mut self) {
        self.material_count = self.materials.len();
    }
}

fn context(root: &std::path::Path) -> Parcel {
    let mut parcel = Parcel::new();
    parcel.register_source(DirStore::new(root), 0);
    parcel.register_sink(DirStore::new(root));
    parcel.register::<Texture>().unwrap();
    parcel.register::<Material>().unwrap();
    parcel.register::<Scene>().unwrap();
    parcel
}

#[test]
fn scene_graph_survives_a_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut parcel = context(dir.path());

    let texture = parcel.create::<Texture>().unwrap();
    texture.borrow_mut().file = "stone.png".into();
    texture.borrow_mut().pixels = vec![0, 127, 255];
    parcel.set_save_path(&texture, "textures/stone").unwrap();

    let stone = parcel.create::<Material>().unwrap();
    {
        let mut m = stone.borrow_mut();
        m.name = "stone".into();
        m.tint = [0.5, 0.5, 0.25];
        m.texture = Some(texture.clone());
    }
    // An unbound material is embedded in the scene document.
    let glass = parcel.create::<Material>().unwrap();
    glass.borrow_mut().name = "glass".into();
    parcel.set_save_path(&stone, "materials/stone").unwrap();

    let scene = parcel.create::<Scene>().unwrap();
    assert!(scene.borrow().constructed);
    {
        let mut s = scene.borrow_mut();
        s.title = "cave".into();
        s.materials = vec![stone.clone(), glass.clone()];
        s.layers = BTreeMap::from([(0, "ground".into()), (10, "sky".into())]);
        s.tags = HashMap::from([("dark".into(), true)]);
        s.scratch = "not saved".into();
    }
    parcel.set_save_path(&scene, "scenes/cave").unwrap();

    let written = std::fs::read_to_string(dir.path().join("scenes/cave.parcel")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(doc["Obj"]["materials"][0], "materials/stone.parcel");
    assert_eq!(doc["Obj"]["materials"][1]["name"], "glass");
    assert_eq!(doc["Obj"]["layers"]["10"], "sky");
    assert!(doc["Obj"].get("scratch").is_none());
    assert!(doc["Obj"].get("constructed").is_none());

    let mut fresh = context(dir.path());
    let loaded: Ref<Scene> = fresh.load("scenes/cave").unwrap();
    let s = loaded.borrow();
    assert_eq!(s.title, "cave");
    assert_eq!(s.material_count, 2);
    assert!(s.constructed);
    assert!(s.scratch.is_empty());
    assert_eq!(s.layers.get(&10).map(String::as_str), Some("sky"));
    assert_eq!(s.tags.get("dark"), Some(&true));

    let stone2: Ref<Material> = fresh.load("materials/stone").unwrap();
    assert!(Ref::ptr_eq(&s.materials[0], &stone2));
    assert_eq!(stone2.borrow().tint, [0.5, 0.5, 0.25]);
    let texture2 = stone2.borrow().texture.clone().unwrap();
    assert_eq!(*texture2.borrow(), *texture.borrow());
    assert_eq!(fresh.path_of(&texture2), Some("textures/stone.parcel"));

    let glass2 = s.materials[1].clone();
    assert_eq!(glass2.borrow().name, "glass");
    assert!(fresh.path_of(&glass2).is_none());
}

#[test]
fn saved_changes_are_visible_to_later_contexts() {
    let dir = tempfile::tempdir().unwrap();
    let mut parcel = context(dir.path());
    let texture = parcel.create::<Texture>().unwrap();
    parcel.set_save_path(&texture, "t").unwrap();

    texture.borrow_mut().file = "changed.png".into();
    parcel.save(&texture).unwrap();

    let mut fresh = context(dir.path());
    let loaded: Ref<Texture> = fresh.load("t.parcel").unwrap();
    assert_eq!(loaded.borrow().file, "changed.png");
}

#[test]
fn dangling_reference_fails_the_whole_load() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("m.parcel"),
        r#"{"Type":"Material","Parent":"","Obj":{"name":"m","texture":"gone.parcel"}}"#,
    )
    .unwrap();

    let mut parcel = context(dir.path());
    let err = parcel.load::<Material>("m").unwrap_err();
    assert!(matches!(err, ParcelError::NotFound { ref path } if path == "gone.parcel"));
    assert!(parcel.directory().is_empty());
}

#[test]
fn unsafe_paths_are_rejected_by_the_directory_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut parcel = context(dir.path());
    let texture = parcel.create::<Texture>().unwrap();
    let err = parcel.set_save_path(&texture, "../escape").unwrap_err();
    assert!(matches!(err, ParcelError::Fs(_)));
}
