//! Reading and writing Electron `asar` archives.
//!
//! An asar file is a Chromium pickle holding the size of a second pickle,
//! which in turn holds a JSON directory tree. Packed file contents follow the
//! header back to back; each file entry records its offset relative to the end
//! of the header as a decimal string.

use crate::checksum::{integrity_of, Integrity};
use crate::error::CommonError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// A directory node. The archive root is itself a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub files: BTreeMap<String, Entry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entry {
    Directory(Header),
    File(FileEntry),
    Link(LinkEntry),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unpacked: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub executable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<Integrity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    /// Target path relative to the archive root, `/`-separated.
    pub link: String,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Directory holding the files an archive marks as `unpacked`.
pub fn unpacked_dir(archive: &Path) -> PathBuf {
    let mut name = archive.as_os_str().to_os_string();
    name.push(".unpacked");
    PathBuf::from(name)
}

/// Parse the header of `archive`, returning it together with the absolute
/// offset at which packed file data begins.
pub fn read_header(archive: &Path) -> Result<(Header, u64), CommonError> {
    let mut file = File::open(archive)?;
    read_header_from(&mut file, archive)
}

fn read_header_from(file: &mut File, archive: &Path) -> Result<(Header, u64), CommonError> {
    let file_len = file.metadata()?.len();

    let mut size_pickle = [0u8; 8];
    read_exact_or_invalid(file, &mut size_pickle, archive)?;
    if le_u32(&size_pickle, 0) != 4 {
        return Err(invalid(archive, "size pickle has unexpected payload length"));
    }

    let header_len = le_u32(&size_pickle, 4) as u64;
    if header_len < 8 || 8 + header_len > file_len {
        return Err(invalid(archive, "header length out of range"));
    }

    let mut header_buf = vec![0u8; header_len as usize];
    read_exact_or_invalid(file, &mut header_buf, archive)?;

    let json_len = i32::from_le_bytes([header_buf[4], header_buf[5], header_buf[6], header_buf[7]]);
    let json_end = usize::try_from(json_len)
        .ok()
        .map(|len| 8 + len)
        .filter(|end| *end <= header_buf.len())
        .ok_or_else(|| invalid(archive, "header string length out of range"))?;

    let header: Header = serde_json::from_slice(&header_buf[8..json_end])?;
    Ok((header, 8 + header_len))
}

/// Unpack every entry of `archive` below `dest`, creating `dest` if needed.
///
/// Returns the number of regular files written.
pub fn extract_all(archive: &Path, dest: &Path) -> Result<usize, CommonError> {
    let mut file = File::open(archive)?;
    let (header, data_offset) = read_header_from(&mut file, archive)?;
    let unpacked_root = unpacked_dir(archive);

    let mut entries = Vec::new();
    flatten(&header.files, Path::new(""), &mut entries)?;

    fs::create_dir_all(dest)?;
    let mut written = 0;

    for (relative, entry) in entries {
        let out_path = dest.join(&relative);

        match entry {
            Entry::Directory(_) => {
                fs::create_dir_all(&out_path)?;
            }
            Entry::File(node) => {
                if let Some(parent) = out_path.parent() {
                    fs::create_dir_all(parent)?;
                }

                if node.unpacked {
                    fs::copy(unpacked_root.join(&relative), &out_path)?;
                } else {
                    let offset = node
                        .offset
                        .as_deref()
                        .and_then(|value| value.parse::<u64>().ok())
                        .ok_or_else(|| {
                            invalid(archive, &format!("bad offset for {}", relative.display()))
                        })?;
                    file.seek(SeekFrom::Start(data_offset + offset))?;
                    let mut outfile = File::create(&out_path)?;
                    let copied = io::copy(&mut (&mut file).take(node.size), &mut outfile)?;
                    if copied != node.size {
                        return Err(invalid(
                            archive,
                            &format!("data for {} is truncated", relative.display()),
                        ));
                    }
                }

                if node.executable {
                    set_executable(&out_path)?;
                }
                written += 1;
            }
            Entry::Link(node) => {
                let target = link_relative_to(&relative, &node.link)
                    .ok_or_else(|| invalid(archive, &format!("unsafe link {}", node.link)))?;
                if let Some(parent) = out_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                if out_path.symlink_metadata().is_ok() {
                    fs::remove_file(&out_path)?;
                }
                create_symlink(&target, &out_path)?;
            }
        }
    }

    debug!(
        archive = %archive.display(),
        dest = %dest.display(),
        files = written,
        "extracted archive"
    );
    Ok(written)
}

/// Pack the tree below `src` into a new archive at `archive`, replacing any
/// existing file. The archive is flushed to disk before this returns.
///
/// Returns the number of regular files packed.
pub fn create_package(src: &Path, archive: &Path) -> Result<usize, CommonError> {
    let mut header = Header::default();
    let mut payload: Vec<(PathBuf, u64)> = Vec::new();
    let mut offset = 0u64;

    for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|err| CommonError::Archive(err.to_string()))?
            .to_path_buf();
        let file_type = entry.file_type();

        let node = if file_type.is_symlink() {
            Entry::Link(LinkEntry {
                link: link_target(src, entry.path())?,
            })
        } else if file_type.is_dir() {
            Entry::Directory(Header::default())
        } else {
            let input = File::open(entry.path())?;
            let executable = is_executable(&input.metadata()?);
            let (integrity, size) = integrity_of(BufReader::new(input))?;
            payload.push((entry.path().to_path_buf(), size));
            let node = FileEntry {
                size,
                offset: Some(offset.to_string()),
                unpacked: false,
                executable,
                integrity: Some(integrity),
            };
            offset += size;
            Entry::File(node)
        };

        insert(&mut header, &relative, node)?;
    }

    let json = serde_json::to_vec(&header)?;
    let mut out = BufWriter::new(File::create(archive)?);
    write_pickled_header(&mut out, &json)?;

    for (path, size) in &payload {
        let input = File::open(path)?;
        let copied = io::copy(&mut input.take(*size), &mut out)?;
        if copied != *size {
            return Err(CommonError::Archive(format!(
                "{} changed while packing",
                path.display()
            )));
        }
    }

    let file = out.into_inner().map_err(|err| err.into_error())?;
    file.sync_all()?;

    debug!(
        src = %src.display(),
        archive = %archive.display(),
        files = payload.len(),
        bytes = offset,
        "created archive"
    );
    Ok(payload.len())
}

/// Every file and link path inside `archive`, `/`-separated, in header order.
pub fn list_files(archive: &Path) -> Result<Vec<String>, CommonError> {
    let (header, _) = read_header(archive)?;
    let mut entries = Vec::new();
    flatten(&header.files, Path::new(""), &mut entries)?;

    Ok(entries
        .into_iter()
        .filter(|(_, entry)| !matches!(entry, Entry::Directory(_)))
        .map(|(path, _)| slash_path(&path))
        .collect())
}

fn flatten<'a>(
    files: &'a BTreeMap<String, Entry>,
    prefix: &Path,
    out: &mut Vec<(PathBuf, &'a Entry)>,
) -> Result<(), CommonError> {
    for (name, entry) in files {
        if !is_safe_name(name) {
            return Err(CommonError::Archive(format!(
                "refusing unsafe entry name '{name}'"
            )));
        }
        let path = prefix.join(name);
        out.push((path.clone(), entry));
        if let Entry::Directory(dir) = entry {
            flatten(&dir.files, &path, out)?;
        }
    }
    Ok(())
}

fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains(':')
}

fn insert(header: &mut Header, relative: &Path, node: Entry) -> Result<(), CommonError> {
    let names = relative
        .components()
        .map(|component| match component {
            Component::Normal(name) => name.to_str().map(str::to_string),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| {
            CommonError::Archive(format!("cannot pack path {}", relative.display()))
        })?;

    let Some((leaf, parents)) = names.split_last() else {
        return Err(CommonError::Archive("cannot pack empty path".to_string()));
    };

    let mut dir = header;
    for name in parents {
        dir = match dir.files.get_mut(name) {
            Some(Entry::Directory(child)) => child,
            _ => {
                return Err(CommonError::Archive(format!(
                    "parent of {} is not a directory",
                    relative.display()
                )))
            }
        };
    }
    dir.files.insert(leaf.clone(), node);
    Ok(())
}

fn write_pickled_header<W: Write>(out: &mut W, json: &[u8]) -> Result<(), CommonError> {
    let too_large = || CommonError::Archive("archive header too large".to_string());
    let padded = (json.len() + 3) & !3;
    let payload_len = u32::try_from(4 + padded).map_err(|_| too_large())?;
    let header_len = payload_len.checked_add(4).ok_or_else(too_large)?;
    let json_len = i32::try_from(json.len()).map_err(|_| too_large())?;

    out.write_all(&4u32.to_le_bytes())?;
    out.write_all(&header_len.to_le_bytes())?;
    out.write_all(&payload_len.to_le_bytes())?;
    out.write_all(&json_len.to_le_bytes())?;
    out.write_all(json)?;
    out.write_all(&[0u8; 3][..padded - json.len()])?;
    Ok(())
}

/// Resolve a symlink found while packing to an archive-root-relative path.
fn link_target(src: &Path, link: &Path) -> Result<String, CommonError> {
    let target = fs::read_link(link)?;
    let resolved = match link.parent() {
        Some(parent) if target.is_relative() => parent.join(&target),
        _ => target,
    };

    normalize(&resolved)
        .strip_prefix(normalize(src))
        .ok()
        .filter(|inside| !inside.as_os_str().is_empty())
        .map(slash_path)
        .ok_or_else(|| {
            CommonError::Archive(format!(
                "link {} points outside {}",
                link.display(),
                src.display()
            ))
        })
}

/// Turn a root-relative link target into a path relative to the link itself.
fn link_relative_to(link_path: &Path, target: &str) -> Option<PathBuf> {
    if !target.split('/').all(is_safe_name) {
        return None;
    }

    let depth = link_path
        .parent()
        .map(|parent| parent.components().count())
        .unwrap_or(0);
    let mut relative: PathBuf = std::iter::repeat("..").take(depth).collect();
    relative.extend(target.split('/'));
    Some(relative)
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn read_exact_or_invalid(file: &mut File, buf: &mut [u8], archive: &Path) -> Result<(), CommonError> {
    file.read_exact(buf).map_err(|err| match err.kind() {
        io::ErrorKind::UnexpectedEof => invalid(archive, "unexpected end of file"),
        _ => CommonError::Io(err),
    })
}

fn invalid(archive: &Path, reason: &str) -> CommonError {
    CommonError::Archive(format!("{} is not a valid asar archive: {reason}", archive.display()))
}

fn is_executable(metadata: &fs::Metadata) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.is_file() && metadata.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        let _ = metadata;
        false
    }
}

fn set_executable(path: &Path) -> Result<(), CommonError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms)?;
    }

    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}

fn create_symlink(target: &Path, link: &Path) -> Result<(), CommonError> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link)?;
    }

    #[cfg(windows)]
    {
        std::os::windows::fs::symlink_file(target, link)?;
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = (target, link);
    }

    Ok(())
}
