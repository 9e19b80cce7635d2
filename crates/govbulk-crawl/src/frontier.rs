use govbulk_fetch::FileDescriptor;

/// Files discovered by a crawl, in discovery order.
///
/// Filled by the crawl coordinator only; read-only afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frontier {
    files: Vec<FileDescriptor>,
}

impl Frontier {
    pub(crate) fn push(&mut self, file: FileDescriptor) { self.files.push(file); }

    pub fn len(&self) -> usize { self.files.len() }

    pub fn is_empty(&self) -> bool { self.files.is_empty() }

    pub fn iter(&self) -> std::slice::Iter<'_, FileDescriptor> { self.files.iter() }

    pub fn as_slice(&self) -> &[FileDescriptor] { &self.files }
}

impl FromIterator<FileDescriptor> for Frontier {
    fn from_iter<I: IntoIterator<Item = FileDescriptor>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Frontier {
    type Item = &'a FileDescriptor;
    type IntoIter = std::slice::Iter<'a, FileDescriptor>;

    fn into_iter(self) -> Self::IntoIter { self.files.iter() }
}

impl IntoIterator for Frontier {
    type Item = FileDescriptor;
    type IntoIter = std::vec::IntoIter<FileDescriptor>;

    fn into_iter(self) -> Self::IntoIter { self.files.into_iter() }
}
