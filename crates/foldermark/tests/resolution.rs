use std::fs;

use foldermark::app::resolve::{FolderResolver, ResolveOptions};
use foldermark::app::scan::scan;
use foldermark::domain::model::{OutcomeKind, ResolutionOutcome};
use foldermark::infra::vault::{LocalVault, Vault};

const WITH_NOTE: ResolveOptions = ResolveOptions {
    create_placeholder_note: true,
};

#[test]
fn resolving_twice_leaves_one_folder() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    fs::create_dir_all(temp.path().join("Notes"))?;
    fs::write(temp.path().join("Notes/index.md"), "||Projects/||")?;
    let resolver = FolderResolver::new(LocalVault::new(temp.path()));

    let first = resolver.resolve("Projects/", "Notes/index.md", WITH_NOTE)?;
    let second = resolver.resolve("Projects/", "Notes/index.md", WITH_NOTE)?;

    assert_eq!(first, ResolutionOutcome::created("Notes/Projects"));
    assert_eq!(second.kind, OutcomeKind::AlreadyExists);

    let entries: Vec<_> = fs::read_dir(temp.path().join("Notes/Projects"))?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<Result<_, _>>()?;
    assert_eq!(entries, vec!["Projects.md"]);
    Ok(())
}

#[test]
fn scanned_markers_resolve_in_text_order() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let body = "||Later/|| then ||Sooner/|| and ||not a marker||";
    fs::write(temp.path().join("todo.md"), body)?;
    let resolver = FolderResolver::new(LocalVault::new(temp.path()));

    let results = resolver.resolve_markers(scan(body), "todo.md", ResolveOptions::default());
    let paths: Vec<_> = results
        .into_iter()
        .map(|r| r.result.map(|o| o.path))
        .collect::<Result<_, _>>()?;

    assert_eq!(paths, vec!["Later", "Sooner"]);
    assert!(resolver.vault().exists("Sooner")?);
    Ok(())
}
