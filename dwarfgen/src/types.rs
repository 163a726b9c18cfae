//! Type synthesis: one DIE per unique resolved type.
//!
//! Decoding the runtime type table from object-file relocations is this
//! crate's sibling `nativegen-codegen`'s job; it already hands back
//! fully-resolved types (`ir::types::Type`/`Kind`) built from exactly that
//! decode, so the work left here is purely DIE synthesis: primitive kinds
//! map straight to `DW_TAG_base_type`, and the four generic composite
//! kinds (string, slice, map, channel) are built from a fixed field
//! layout and substituted with the type's actual element/key/value types.
//!
//! Borrowing a decoded internal runtime type's child DIEs would need a
//! decode step this crate doesn't perform (the object-file relocation
//! resolver is out of scope here); the field layouts below are therefore
//! synthesized directly from fixed names (`array`, `elem`, `key`, `val`,
//! `entry`, `last`, `first`, `recvq`, `sendq`, `st`) rather than copied
//! from a decoded `type.runtime.*` DIE tree.

use gimli::write::{AttributeValue, UnitEntryId};
use nativegen_codegen::ir::types::{Kind, Type, TypePool};
use nativegen_codegen::ir::TypeRef;

use crate::roots::Roots;

/// Build (or fetch from the dedup cache) the DIE for `ty`, recursively
/// synthesizing any types it depends on first.
pub fn build_type(roots: &mut Roots, pool: &TypePool, ty: TypeRef, pointer_width: u64) -> UnitEntryId {
    let t = pool.get(ty);
    if let Some(id) = roots.lookup_type(&t.name) {
        return id;
    }
    let id = synthesize(roots, pool, t, pointer_width);
    roots.insert_type(t.name.clone(), id);
    id
}

fn synthesize(roots: &mut Roots, pool: &TypePool, t: &Type, pointer_width: u64) -> UnitEntryId {
    match &t.kind {
        Kind::Bool => base_type(roots, &t.name, t.size, gimli::DW_ATE_boolean),
        Kind::Int(w) => base_type(roots, &t.name, u64::from(*w), gimli::DW_ATE_signed),
        Kind::Uint(w) => base_type(roots, &t.name, u64::from(*w), gimli::DW_ATE_unsigned),
        Kind::Float(w) => base_type(roots, &t.name, u64::from(*w), gimli::DW_ATE_float),
        Kind::Complex(w) => base_type(roots, &t.name, u64::from(*w), gimli::DW_ATE_complex_float),
        Kind::UnsafePointer => pointer_to(roots, &t.name, None),
        Kind::String => composite::string(roots, &t.name, pointer_width),
        Kind::Ptr { pointee } => {
            let inner = build_type(roots, pool, *pointee, pointer_width);
            pointer_to(roots, &t.name, Some(inner))
        }
        Kind::Slice { elem } => {
            let elem_die = build_type(roots, pool, *elem, pointer_width);
            composite::slice(roots, &t.name, elem_die, pointer_width)
        }
        Kind::Array { elem, nel } => {
            let elem_die = build_type(roots, pool, *elem, pointer_width);
            array_type(roots, &t.name, elem_die, *nel)
        }
        Kind::Map { key, val } => {
            let key_die = build_type(roots, pool, *key, pointer_width);
            let val_die = build_type(roots, pool, *val, pointer_width);
            let key_size = pool.get(*key).size;
            let val_size = pool.get(*val).size;
            composite::map(roots, &t.name, key_die, val_die, key_size, val_size, pointer_width)
        }
        Kind::Chan { elem } => {
            let elem_die = build_type(roots, pool, *elem, pointer_width);
            let elem_size = pool.get(*elem).size;
            composite::chan(roots, &t.name, elem_die, elem_size, pointer_width)
        }
        Kind::Struct(layout) => {
            let struct_id = roots.add_die(roots.cu_die, gimli::DW_TAG_structure_type);
            set_name_and_size(roots, struct_id, &t.name, t.size);
            for field in &layout.fields {
                let field_die = build_type(roots, pool, field.ty, pointer_width);
                add_member(roots, struct_id, &field.name, field_die, field.offset);
            }
            struct_id
        }
        Kind::Interface { methods } => {
            // Modeled as a two-word (type, data) pair, matching the
            // runtime interface descriptor the call-dispatch lowering
            // reads from; the method set itself has no DWARF
            // representation this builder's abbrev table supports, so
            // it's recorded only via the struct's name.
            let _ = methods;
            let struct_id = roots.add_die(roots.cu_die, gimli::DW_TAG_structure_type);
            set_name_and_size(roots, struct_id, &t.name, 2 * pointer_width);
            struct_id
        }
        Kind::Func { params, results } => {
            let sub_id = roots.add_die(roots.cu_die, gimli::DW_TAG_subroutine_type);
            {
                let name_id = roots.string(&t.name);
                let die = roots.unit_mut().get_mut(sub_id);
                die.set(gimli::DW_AT_name, AttributeValue::StringRef(name_id));
            }
            if let Some(first_result) = results.first() {
                let ret_die = build_type(roots, pool, *first_result, pointer_width);
                roots.unit_mut().get_mut(sub_id).set(gimli::DW_AT_type, AttributeValue::UnitRef(ret_die));
            }
            for p in params {
                let p_die = build_type(roots, pool, *p, pointer_width);
                let formal = roots.add_die(sub_id, gimli::DW_TAG_formal_parameter);
                roots.unit_mut().get_mut(formal).set(gimli::DW_AT_type, AttributeValue::UnitRef(p_die));
            }
            sub_id
        }
    }
}

fn base_type(roots: &mut Roots, name: &str, size: u64, encoding: gimli::DwAte) -> UnitEntryId {
    let id = roots.add_die(roots.cu_die, gimli::DW_TAG_base_type);
    set_name_and_size(roots, id, name, size);
    roots.unit_mut().get_mut(id).set(gimli::DW_AT_encoding, AttributeValue::Encoding(encoding));
    id
}

fn pointer_to(roots: &mut Roots, name: &str, pointee: Option<UnitEntryId>) -> UnitEntryId {
    let id = roots.add_die(roots.cu_die, gimli::DW_TAG_pointer_type);
    let name_id = roots.string(name);
    let die = roots.unit_mut().get_mut(id);
    die.set(gimli::DW_AT_name, AttributeValue::StringRef(name_id));
    if let Some(pointee) = pointee {
        roots.unit_mut().get_mut(id).set(gimli::DW_AT_type, AttributeValue::UnitRef(pointee));
    }
    id
}

fn array_type(roots: &mut Roots, name: &str, elem: UnitEntryId, nel: u64) -> UnitEntryId {
    let id = roots.add_die(roots.cu_die, gimli::DW_TAG_array_type);
    {
        let name_id = roots.string(name);
        let die = roots.unit_mut().get_mut(id);
        die.set(gimli::DW_AT_name, AttributeValue::StringRef(name_id));
        die.set(gimli::DW_AT_type, AttributeValue::UnitRef(elem));
    }
    let sub = roots.add_die(id, gimli::DW_TAG_subrange_type);
    if nel > 0 {
        roots.unit_mut().get_mut(sub).set(gimli::DW_AT_upper_bound, AttributeValue::Udata(nel - 1));
    }
    id
}

fn set_name_and_size(roots: &mut Roots, id: UnitEntryId, name: &str, size: u64) {
    let name_id = roots.string(name);
    let die = roots.unit_mut().get_mut(id);
    die.set(gimli::DW_AT_name, AttributeValue::StringRef(name_id));
    die.set(gimli::DW_AT_byte_size, AttributeValue::Udata(size));
}

fn add_member(roots: &mut Roots, parent: UnitEntryId, name: &str, ty: UnitEntryId, offset: u64) -> UnitEntryId {
    let id = roots.add_die(parent, gimli::DW_TAG_member);
    let name_id = roots.string(name);
    let die = roots.unit_mut().get_mut(id);
    die.set(gimli::DW_AT_name, AttributeValue::StringRef(name_id));
    die.set(gimli::DW_AT_type, AttributeValue::UnitRef(ty));
    die.set(gimli::DW_AT_data_member_location, AttributeValue::Udata(offset));
    id
}

/// The four generic composite kinds: string, slice, map, and channel.
/// Each borrows a fixed field layout and substitutes the caller's
/// element/key/value type DIE into it, then (for map and channel)
/// replaces the kind-specific DIE with a pointer to the synthesized
/// struct, since runtime map/channel objects are always accessed via
/// pointer.
mod composite {
    use super::*;

    /// `string`: a two-word `(str *uint8, len int)` pair — a runtime
    /// two-word (data, len) pair.
    pub fn string(roots: &mut Roots, name: &str, pointer_width: u64) -> UnitEntryId {
        let byte_ptr = pointer_to(roots, "*uint8", None);
        let int_ty = base_type(roots, "int", pointer_width, gimli::DW_ATE_signed);
        let id = roots.add_die(roots.cu_die, gimli::DW_TAG_structure_type);
        set_name_and_size(roots, id, name, 2 * pointer_width);
        add_member(roots, id, "str", byte_ptr, 0);
        add_member(roots, id, "len", int_ty, pointer_width);
        id
    }

    /// `slice`: the three-word `(array, len, cap)` header. `elem`
    /// substitutes the generic element type into the `array` field's
    /// pointee.
    pub fn slice(roots: &mut Roots, name: &str, elem: UnitEntryId, pointer_width: u64) -> UnitEntryId {
        let elem_ptr = roots.add_die(roots.cu_die, gimli::DW_TAG_pointer_type);
        roots.unit_mut().get_mut(elem_ptr).set(gimli::DW_AT_type, AttributeValue::UnitRef(elem));
        let int_ty = base_type(roots, "int", pointer_width, gimli::DW_ATE_signed);
        let id = roots.add_die(roots.cu_die, gimli::DW_TAG_structure_type);
        set_name_and_size(roots, id, name, 3 * pointer_width);
        add_member(roots, id, "array", elem_ptr, 0);
        add_member(roots, id, "len", int_ty, pointer_width);
        add_member(roots, id, "cap", int_ty, 2 * pointer_width);
        id
    }

    /// `map<K,V>`: a pointer-to-`hash<K,V>` struct, whose `st` field points
    /// at a synthesized `hash_subtable<K,V>` of `hash_entry<K,V>` buckets —
    /// for a map type named `map[string]int` this produces a pointer DIE
    /// to a `hash<string,int>` struct with a substituted `st` field
    /// pointing to `hash_subtable<string,int>`.
    pub fn map(
        roots: &mut Roots,
        name: &str,
        key: UnitEntryId,
        val: UnitEntryId,
        key_size: u64,
        val_size: u64,
        pointer_width: u64,
    ) -> UnitEntryId {
        const BUCKET_COUNT: u64 = 8;

        let entry_id = roots.add_die(roots.cu_die, gimli::DW_TAG_structure_type);
        let val_offset = key_size;
        let entry_size = val_offset + val_size;
        set_name_and_size(roots, entry_id, &format!("hash_entry<{}>", name), entry_size);
        add_member(roots, entry_id, "key", key, 0);
        add_member(roots, entry_id, "val", val, val_offset);

        let bucket_array = array_type(roots, &format!("hash_entry<{}>[{}]", name, BUCKET_COUNT), entry_id, BUCKET_COUNT);
        let subtable_id = roots.add_die(roots.cu_die, gimli::DW_TAG_structure_type);
        set_name_and_size(roots, subtable_id, &format!("hash_subtable<{}>", name), entry_size * BUCKET_COUNT);
        add_member(roots, subtable_id, "entry", bucket_array, 0);

        let subtable_ptr = roots.add_die(roots.cu_die, gimli::DW_TAG_pointer_type);
        roots.unit_mut().get_mut(subtable_ptr).set(gimli::DW_AT_type, AttributeValue::UnitRef(subtable_id));

        let count_ty = base_type(roots, "int", pointer_width, gimli::DW_ATE_signed);
        let hash_id = roots.add_die(roots.cu_die, gimli::DW_TAG_structure_type);
        set_name_and_size(roots, hash_id, &format!("hash<{}>", name), 2 * pointer_width + pointer_width);
        add_member(roots, hash_id, "count", count_ty, 0);
        add_member(roots, hash_id, "st", subtable_ptr, pointer_width);

        pointer_to(roots, name, Some(hash_id))
    }

    /// `chan<T>`: a pointer-to-`hchan<T>` struct holding a circular buffer
    /// of `T` plus two wait queues (`recvq`, `sendq`), each a `waitq<T>`
    /// of `(first, last)` `sudog<T>` pointers.
    pub fn chan(roots: &mut Roots, name: &str, elem: UnitEntryId, elem_size: u64, pointer_width: u64) -> UnitEntryId {
        let sudog_id = roots.add_die(roots.cu_die, gimli::DW_TAG_structure_type);
        let sudog_ptr = roots.add_die(roots.cu_die, gimli::DW_TAG_pointer_type);
        roots.unit_mut().get_mut(sudog_ptr).set(gimli::DW_AT_type, AttributeValue::UnitRef(sudog_id));
        set_name_and_size(roots, sudog_id, &format!("sudog<{}>", name), 2 * pointer_width + elem_size);
        add_member(roots, sudog_id, "next", sudog_ptr, 0);
        add_member(roots, sudog_id, "elem", elem, pointer_width);

        let waitq_id = roots.add_die(roots.cu_die, gimli::DW_TAG_structure_type);
        set_name_and_size(roots, waitq_id, &format!("waitq<{}>", name), 2 * pointer_width);
        add_member(roots, waitq_id, "first", sudog_ptr, 0);
        add_member(roots, waitq_id, "last", sudog_ptr, pointer_width);

        let elem_ptr = roots.add_die(roots.cu_die, gimli::DW_TAG_pointer_type);
        roots.unit_mut().get_mut(elem_ptr).set(gimli::DW_AT_type, AttributeValue::UnitRef(elem));
        let uint_ty = base_type(roots, "uint", pointer_width, gimli::DW_ATE_unsigned);

        let hchan_id = roots.add_die(roots.cu_die, gimli::DW_TAG_structure_type);
        set_name_and_size(roots, hchan_id, &format!("hchan<{}>", name), 4 * pointer_width + 2 * (2 * pointer_width));
        add_member(roots, hchan_id, "qcount", uint_ty, 0);
        add_member(roots, hchan_id, "buf", elem_ptr, pointer_width);
        add_member(roots, hchan_id, "recvq", waitq_id, 2 * pointer_width);
        add_member(roots, hchan_id, "sendq", waitq_id, 2 * pointer_width + 2 * pointer_width);

        pointer_to(roots, name, Some(hchan_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roots::RootsConfig;
    use nativegen_codegen::ir::types::{Kind, Type};

    fn test_roots() -> Roots {
        Roots::new(RootsConfig {
            address_size: 8,
            producer: "nativegen",
            comp_dir: "/src",
            comp_name: "main.ng",
            language: gimli::DwLang(0x8000),
        })
    }

    #[test]
    fn primitive_types_dedup_by_name() {
        let mut roots = test_roots();
        let mut pool = TypePool::new();
        let r1 = pool.push(Type { name: "int32".into(), kind: Kind::Int(4), size: 4, align: 4, no_pointers: true });
        let first = build_type(&mut roots, &pool, r1, 8);
        let second = build_type(&mut roots, &pool, r1, 8);
        assert_eq!(first, second);
    }

    #[test]
    fn map_type_is_a_pointer_to_a_synthesized_hash_struct() {
        let mut roots = test_roots();
        let mut pool = TypePool::new();
        let key = pool.push(Type { name: "string".into(), kind: Kind::String, size: 16, align: 8, no_pointers: false });
        let val = pool.push(Type { name: "int".into(), kind: Kind::Int(8), size: 8, align: 8, no_pointers: true });
        let map_ty = pool.push(Type {
            name: "map[string]int".into(),
            kind: Kind::Map { key, val },
            size: 8,
            align: 8,
            no_pointers: false,
        });
        let die = build_type(&mut roots, &pool, map_ty, 8);
        assert_eq!(roots.unit().get(die).tag(), gimli::DW_TAG_pointer_type);
        let hash_id = match roots.unit().get(die).get(gimli::DW_AT_type) {
            Some(AttributeValue::UnitRef(id)) => *id,
            other => panic!("expected a UnitRef, got {:?}", other),
        };
        assert_eq!(roots.unit().get(hash_id).tag(), gimli::DW_TAG_structure_type);
    }
}
