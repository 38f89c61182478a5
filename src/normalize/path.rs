//! Path canonicalization: decode, collapse dot segments and duplicate
//! slashes, re-encode.

use crate::url_util::{decode, encode};

/// Normalize a path by repeatedly decoding hex escapes, folding `.` and
/// `..` segments and duplicate slashes, and re-encoding once. The
/// pipeline is idempotent.
pub(crate) fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    let path = decode(path);
    let path = sanitize_dots_and_slashes(&path);
    encode(&path)
}

/// Collapse `//` to `/`, remove `/./` segments, and make `/../` pop the
/// previous segment. Dots that are part of a longer segment (`/a./b.`)
/// are untouched. An emptied path becomes `/`.
fn sanitize_dots_and_slashes(path: &str) -> String {
    let mut chars: Vec<char> = path.chars().collect();
    let mut slash_stack: Vec<isize> = Vec::new();

    let mut index: isize = 0;
    while index < chars.len() as isize - 1 {
        let i = index as usize;
        let len = chars.len() as isize;
        if chars[i] == '/' {
            slash_stack.push(index);
            if chars[i + 1] == '.' {
                if index < len - 2 && chars[i + 2] == '.' {
                    // looks like "/../" or ends with "/.."
                    if (index < len - 3 && chars[i + 3] == '/') || index == len - 3 {
                        let end_of_path = index == len - 3;
                        slash_stack.pop();
                        let end_index = index + 3;
                        // backtrack so this slash can take part in another
                        // collapse
                        index = slash_stack.pop().map_or(-1, |s| s - 1);
                        let start_index = if end_of_path { index + 1 } else { index };
                        chars.drain((start_index + 1) as usize..end_index as usize);
                    }
                } else if (index < len - 2 && chars[i + 2] == '/') || index == len - 2 {
                    let end_of_path = index == len - 2;
                    slash_stack.pop();
                    let start_index = if end_of_path { index + 1 } else { index };
                    // "/./" -> "/"
                    chars.drain(start_index as usize..(index + 2) as usize);
                    index -= 1;
                }
            } else if chars[i + 1] == '/' {
                slash_stack.pop();
                chars.remove(i);
                index -= 1;
            }
        }
        index += 1;
    }

    if chars.is_empty() {
        // every path has at least a slash
        return "/".to_string();
    }
    chars.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        let cases = [
            ("/%25%32%35", "/%25"),
            ("/%2%2%2", "/%252%252%252"),
            ("/%2%%335", "/%25"),
            ("/%25%32%35%25%32%35", "/%25%25"),
            ("/%2525252525252525", "/%25"),
            ("/asdf%25%32%35asd", "/asdf%25asd"),
            ("/%%%25%32%35asd%%", "/%25%25%25asd%25%25"),
            (
                "/%2E%73%65%63%75%72%65/%77%77%77%2E%65%62%61%79%2E%63%6F%6D/",
                "/.secure/www.ebay.com/",
            ),
            (
                "/uploads/%20%20%20%20/.verify/.eBaysecure=updateuserdataxplimnbqmn-xplmvalidateinfoswqpcmlx=hgplmcx/",
                "/uploads/%20%20%20%20/.verify/.eBaysecure=updateuserdataxplimnbqmn-xplmvalidateinfoswqpcmlx=hgplmcx/",
            ),
            (
                "/%257Ea%2521b%2540c%2523d%2524e%25f%255E00%252611%252A22%252833%252944_55%252B",
                "/~a!b@c%23d$e%25f^00&11*22(33)44_55+",
            ),
            ("/lala/.././../..../", "/..../"),
            ("//asdfasdf/awef/sadf/sdf//", "/asdfasdf/awef/sadf/sdf/"),
            ("/", "/"),
            ("/a/../b/c", "/b/c"),
            ("/blah/..", "/"),
            ("../", "../"),
            ("/asdf/.", "/asdf/"),
            ("/a/b/./././././../c/d", "/a/c/d"),
            ("/a/b//////.///././././../c/d", "/a/c/d"),
            ("//../a/c/..///sdf", "/a/sdf"),
            ("/../asdf", "/asdf"),
            ("/../asdf/", "/asdf/"),
            ("/a/b/..c", "/a/b/..c"),
            ("/a/b/.././", "/a/"),
            ("/a/b/./", "/a/b/"),
            ("/a/b/../..", "/"),
            ("/a/b/../../../../../../", "/"),
            ("/a/b/../../../../../..", "/"),
            ("/a/b/../../../../../../c/d", "/c/d"),
            ("/a/b/../../../../../../c/d/", "/c/d/"),
            ("/a/b/../.", "/a/"),
            ("/a/b/..", "/a/"),
            ("/1.html", "/1.html"),
            ("/1/2.html?param=1", "/1/2.html?param=1"),
            ("/a./b.", "/a./b."),
            ("/a./b./", "/a./b./"),
        ];
        for (path, expected) in cases {
            assert_eq!(normalize_path(path), expected, "path: {path:?}");
        }
    }

    #[test]
    fn test_normalize_path_is_idempotent() {
        let paths = [
            "/a/b/../../../../../../c/d",
            "/%2525252525252525",
            "//asdfasdf/awef/sadf/sdf//",
            "/a./b.",
            "/uploads/%20%20%20%20/",
        ];
        for path in paths {
            let once = normalize_path(path);
            assert_eq!(normalize_path(&once), once, "path: {path:?}");
        }
    }
}
