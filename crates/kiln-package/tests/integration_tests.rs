use kiln_package::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Install `coordinate` into the store with the given dependencies
fn install(store: &PackageStore, coordinate: &str, dependencies: &[&str]) {
    let coordinate = ProjectCoordinate::parse(coordinate).unwrap();
    let mut descriptor = ProjectDescriptor::new(
        coordinate.publisher(),
        coordinate.project(),
        coordinate.version().cloned().unwrap(),
    );
    for dependency in dependencies {
        descriptor = descriptor.with_dependency(ProjectCoordinate::parse(dependency).unwrap());
    }

    let folder = store.coordinate_folder(&coordinate).unwrap();
    fs::create_dir_all(&folder).unwrap();
    descriptor.save(&store.descriptor_path(&coordinate).unwrap()).unwrap();
    fs::write(store.library_path(&coordinate).unwrap(), "jar").unwrap();
}

fn app(dependencies: &[&str]) -> ProjectDescriptor {
    dependencies.iter().fold(
        ProjectDescriptor::new("qub", "app", VersionNumber::parse("1").unwrap()),
        |descriptor, dependency| {
            descriptor.with_dependency(ProjectCoordinate::parse(dependency).unwrap())
        },
    )
}

fn rows(nodes: &[DependencyNode]) -> Vec<String> {
    nodes
        .iter()
        .flat_map(|node| node.flatten())
        .map(|(depth, node)| {
            let issue = node
                .issue
                .as_ref()
                .map(|issue| format!(" ({})", issue))
                .unwrap_or_default();
            format!("{}{}{}", "  ".repeat(depth), node.coordinate, issue)
        })
        .collect()
}

mod store_layout {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_installed_project_is_found() {
        let temp = TempDir::new().unwrap();
        let store = PackageStore::new(temp.path());
        install(&store, "qub/lib@2.1.0", &[]);

        let coordinate = ProjectCoordinate::parse("qub/lib@2.1.0").unwrap();
        assert!(store.is_installed(&coordinate));
        assert_eq!(
            store.library_path(&coordinate).unwrap(),
            temp.path().join("qub/lib/versions/2.1.0/lib.jar")
        );

        let descriptor = store.load_descriptor(&coordinate).unwrap();
        assert_eq!(descriptor.coordinate(), Some(coordinate));
    }

    #[test]
    fn test_latest_of_several_versions() {
        let temp = TempDir::new().unwrap();
        let store = PackageStore::new(temp.path());
        for version in ["1", "1.0.1", "2-beta", "2", "10"] {
            install(&store, &format!("qub/lib@{}", version), &[]);
        }

        let mut versions: Vec<String> = store
            .installed_versions("qub", "lib")
            .map(|v| v.to_string())
            .collect();
        versions.sort();
        assert_eq!(versions, vec!["1", "1.0.1", "10", "2", "2-beta"]);

        assert_eq!(store.latest_version("qub", "lib").unwrap().to_string(), "10");
    }

    #[test]
    fn test_descriptor_extra_keys_survive_install() {
        let temp = TempDir::new().unwrap();
        let store = PackageStore::new(temp.path());
        install(&store, "qub/lib@1", &[]);

        let path = store
            .descriptor_path(&ProjectCoordinate::parse("qub/lib@1").unwrap())
            .unwrap();
        let mut json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        json["java"] = serde_json::json!({ "version": "17", "mainClass": "qub.Main" });
        json["license"] = serde_json::json!("MIT");
        fs::write(&path, json.to_string()).unwrap();

        let descriptor = ProjectDescriptor::load(&path).unwrap();
        assert_eq!(descriptor.toolchain_requirement(), Some(VersionNumber::parse("17").unwrap()));

        let rewritten: serde_json::Value =
            serde_json::from_str(&descriptor.to_json_string().unwrap()).unwrap();
        assert_eq!(rewritten, json);
    }
}

mod dependency_graphs {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tree_of_installed_graph() {
        let temp = TempDir::new().unwrap();
        let store = PackageStore::new(temp.path());
        install(&store, "qub/web@3", &["qub/http@2", "qub/json@1"]);
        install(&store, "qub/http@2", &["qub/io@1"]);
        install(&store, "qub/io@1", &[]);
        install(&store, "qub/json@1", &["qub/io@1"]);

        let descriptor = app(&["qub/web@3", "qub/json@1"]);
        let resolver = DependencyResolver::new(&store);

        assert_eq!(
            rows(&resolver.resolve_tree(&descriptor)),
            vec![
                "qub/web@3",
                "  qub/http@2",
                "    qub/io@1",
                "  qub/json@1",
                "    qub/io@1",
                "qub/json@1",
                "  qub/io@1",
            ]
        );

        let closure = resolver.resolve_closure(&descriptor);
        let coordinates: Vec<String> = closure.coordinates.iter().map(|c| c.to_string()).collect();
        assert_eq!(
            coordinates,
            vec!["qub/web@3", "qub/http@2", "qub/io@1", "qub/json@1"]
        );
        assert!(closure.issues.is_empty());
    }

    #[test]
    fn test_broken_branches_do_not_stop_resolution() {
        let temp = TempDir::new().unwrap();
        let store = PackageStore::new(temp.path());
        install(&store, "qub/good@1", &[]);
        install(&store, "qub/corrupt@1", &[]);
        fs::write(
            store
                .descriptor_path(&ProjectCoordinate::parse("qub/corrupt@1").unwrap())
                .unwrap(),
            "{ not json",
        )
        .unwrap();

        let descriptor = app(&["qub/missing@4", "qub/corrupt@1", "qub/unpinned", "qub/good@1"]);
        let resolver = DependencyResolver::new(&store);

        assert_eq!(resolver.resolve_direct(&descriptor).len(), 4);

        let tree = resolver.resolve_tree(&descriptor);
        assert_eq!(tree.len(), 4);
        assert!(tree[0]
            .issue
            .as_deref()
            .unwrap()
            .starts_with("Could not find project.json file for qub/missing@4"));
        assert!(tree[1].issue.is_some());
        assert_eq!(
            tree[2].issue.as_deref(),
            Some("No installed versions of qub/unpinned found")
        );
        assert_eq!(tree[3].issue, None);

        let closure = resolver.resolve_closure(&descriptor);
        assert_eq!(closure.issues.len(), 3);
        assert_eq!(closure.coordinates.len(), 3);
    }

    #[test]
    fn test_hand_edited_cycle_terminates() {
        let temp = TempDir::new().unwrap();
        let store = PackageStore::new(temp.path());
        install(&store, "qub/a@1", &["qub/b@1"]);
        install(&store, "qub/b@1", &["qub/a@1"]);

        let tree = DependencyResolver::new(&store).resolve_tree(&app(&["qub/a@1"]));
        let rows = rows(&tree);
        assert_eq!(rows.len(), 3);
        assert!(rows[2].contains("Dependency cycle detected: qub/app@1 -> qub/a@1 -> qub/b@1 -> qub/a@1"));
    }
}

mod toolchains {
    use super::*;
    use pretty_assertions::assert_eq;

    fn install_jdk(root: &Path, version: &str) {
        fs::create_dir_all(root.join("openjdk/jdk/versions").join(version).join("bin")).unwrap();
    }

    #[test]
    fn test_latest_and_pinned_toolchains() {
        let temp = TempDir::new().unwrap();
        install_jdk(temp.path(), "11.0.2");
        install_jdk(temp.path(), "16.0.1");
        install_jdk(temp.path(), "17");
        let store = PackageStore::new(temp.path());
        let locator = ToolchainLocator::new(&store);

        let latest = locator.latest().unwrap();
        assert_eq!(latest.version().to_string(), "17");
        assert!(latest.compiler().starts_with(temp.path().join("openjdk/jdk/versions/17/bin")));

        let pinned = locator
            .locate(Some(&VersionNumber::parse("11.0.2").unwrap()))
            .unwrap();
        assert_eq!(pinned.root(), temp.path().join("openjdk/jdk/versions/11.0.2"));

        let err = locator.exact(&VersionNumber::parse("21").unwrap()).unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("openjdk/jdk@21"));
    }
}
