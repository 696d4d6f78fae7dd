use std::{
    collections::{BTreeSet, HashMap},
    fmt::{self, Debug},
    fs::File,
    io::{Read, Seek},
    path::Path,
    sync::Arc,
};

use dashmap::DashMap;
use log::{debug, trace, warn};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use zip::ZipArchive;

use crate::{class::ClassFile, error::ArchiveError};

/// Upper bound for buffer preallocation from the size an entry claims.
const MAX_PREALLOCATION: usize = 16 * 1024 * 1024;

/// A jar (or any zip) whose classes are parsed on demand.
///
/// Class names are accepted in either internal (`java/lang/Object`) or
/// qualified (`java.lang.Object`) form. Parsed classes are cached for the
/// lifetime of the archive, so repeated lookups hand out the same [`Arc`].
pub struct Archive<R> {
    label: String,
    zip_file: Mutex<ZipArchive<R>>,
    // internal class name -> entry path
    entries: HashMap<Arc<str>, String>,
    class_registry: DashMap<Arc<str>, Arc<OnceCell<Arc<ClassFile>>>>,
}

/// Maps `a/b/C.class` to `a/b/C`. Directories, non-class entries and the
/// versioned copies under `META-INF/` are not classes of this archive.
fn class_name_of_entry(path: &str) -> Option<&str> {
    if path.starts_with("META-INF/") {
        return None;
    }
    let name = path.strip_suffix(".class")?;
    if name.is_empty() || name.ends_with('/') {
        return None;
    }
    Some(name)
}

fn to_internal_name(name: &str) -> String {
    name.replace('.', "/")
}

fn to_qualified_name(name: &str) -> String {
    name.replace('/', ".")
}

impl Archive<File> {
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let file = File::open(path).map_err(|source| ArchiveError::Open {
            label: label.clone(),
            source,
        })?;
        Archive::open(file, label)
    }
}

impl<R: Read + Seek> Archive<R> {
    /// Reads the central directory of `reader`. `label` names the archive in
    /// diagnostics only.
    pub fn open(reader: R, label: impl Into<String>) -> Result<Self, ArchiveError> {
        let label = label.into();
        let zip_file = ZipArchive::new(reader).map_err(|source| ArchiveError::Corrupt {
            label: label.clone(),
            source,
        })?;

        let entries: HashMap<Arc<str>, String> = zip_file
            .file_names()
            .filter_map(|path| class_name_of_entry(path).map(|name| (Arc::from(name), path.to_string())))
            .collect();

        debug!(
            "opened {label}: {} entries, {} classes",
            zip_file.len(),
            entries.len()
        );

        Ok(Archive {
            label,
            zip_file: Mutex::new(zip_file),
            entries,
            class_registry: DashMap::new(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of class entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Qualified names of all classes in the archive, sorted.
    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .keys()
            .map(|name| to_qualified_name(name))
            .collect();
        names.sort_unstable();
        names
    }

    pub fn contains_class(&self, name: &str) -> bool {
        self.entries.contains_key(to_internal_name(name).as_str())
    }

    /// Looks up a class, parsing it on first use.
    ///
    /// A class that isn't in this archive is `Ok(None)`. An entry that exists
    /// but can't be read or parsed is an error; it is not cached, so a later
    /// call tries again.
    pub fn try_load_class(&self, name: &str) -> Result<Option<Arc<ClassFile>>, ArchiveError> {
        let internal_name = to_internal_name(name);
        let Some((class_name, entry)) = self.entries.get_key_value(internal_name.as_str()) else {
            trace!("{}: no class {internal_name}", self.label);
            return Ok(None);
        };

        let class_cell = Arc::clone(
            self.class_registry
                .entry(Arc::clone(class_name))
                .or_default()
                .value(),
        );

        let class = class_cell.get_or_try_init(|| self.define_class(class_name, entry))?;

        Ok(Some(Arc::clone(class)))
    }

    fn define_class(&self, class_name: &str, entry: &str) -> Result<Arc<ClassFile>, ArchiveError> {
        let class_bytes = self.get_class_bytes(entry)?;

        let class_file = ClassFile::parse(&class_bytes).map_err(|source| ArchiveError::Class {
            label: self.label.clone(),
            entry: entry.to_string(),
            source,
        })?;

        if class_file.name() != class_name {
            return Err(ArchiveError::NameMismatch {
                label: self.label.clone(),
                entry: entry.to_string(),
                declared: class_file.name().to_string(),
            });
        }

        debug!("{}: parsed {class_name}", self.label);
        Ok(Arc::new(class_file))
    }

    fn get_class_bytes(&self, entry: &str) -> Result<Vec<u8>, ArchiveError> {
        let mut archive = self.zip_file.lock();
        let mut class_file = archive
            .by_name(entry)
            .map_err(|source| ArchiveError::Corrupt {
                label: self.label.clone(),
                source,
            })?;

        let capacity = usize::try_from(class_file.size())
            .unwrap_or(0)
            .min(MAX_PREALLOCATION);
        let mut content = Vec::with_capacity(capacity);
        class_file
            .read_to_end(&mut content)
            .map_err(|source| ArchiveError::Io {
                label: self.label.clone(),
                entry: entry.to_string(),
                source,
            })?;
        Ok(content)
    }

    /// Loads every class. A broken entry doesn't stop the others; its error is
    /// returned next to the classes that did load.
    pub fn load_all(&self) -> (Vec<Arc<ClassFile>>, Vec<ArchiveError>) {
        let mut names: Vec<&Arc<str>> = self.entries.keys().collect();
        names.sort_unstable();

        let mut classes = Vec::with_capacity(names.len());
        let mut errors = Vec::new();
        for name in names {
            match self.try_load_class(name) {
                Ok(Some(class)) => classes.push(class),
                Ok(None) => {}
                Err(err) => {
                    warn!("skipping {name}: {err}");
                    errors.push(err);
                }
            }
        }
        (classes, errors)
    }
}

impl<R> Debug for Archive<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archive")
            .field("label", &self.label)
            .field("classes", &self.entries.len())
            .field("loaded", &self.class_registry.len())
            .finish()
    }
}

/// Archives searched in order, the first one containing a class wins.
pub struct ClassPath<R> {
    archives: Vec<Archive<R>>,
}

impl<R> Default for ClassPath<R> {
    fn default() -> Self {
        ClassPath {
            archives: Vec::new(),
        }
    }
}

impl<R> Debug for ClassPath<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.archives).finish()
    }
}

impl<R: Read + Seek> ClassPath<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, archive: Archive<R>) {
        self.archives.push(archive);
    }

    pub fn archives(&self) -> &[Archive<R>] {
        &self.archives
    }

    pub fn try_load_class(&self, name: &str) -> Result<Option<Arc<ClassFile>>, ArchiveError> {
        for archive in &self.archives {
            if let Some(class) = archive.try_load_class(name)? {
                return Ok(Some(class));
            }
        }
        debug!("class {name} not found in {} archive(s)", self.archives.len());
        Ok(None)
    }

    /// Union of the class names of all archives, sorted.
    pub fn class_names(&self) -> Vec<String> {
        self.archives
            .iter()
            .flat_map(Archive::class_names)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl<R: Read + Seek> FromIterator<Archive<R>> for ClassPath<R> {
    fn from_iter<T: IntoIterator<Item = Archive<R>>>(iter: T) -> Self {
        ClassPath {
            archives: iter.into_iter().collect(),
        }
    }
}
