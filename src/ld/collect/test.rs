// Tests for override chain collection
//
//  Copyright (C) 2014-2023 Ryan Specialty, LLC.
//
//  This file is part of WEAVER.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

use super::*;
use crate::{span::dummy::DUMMY_CONTEXT, syntax::parse::parse};

fn sut(src: &str) -> Collected {
    let parsed = parse(DUMMY_CONTEXT, src).unwrap();
    let order = LayerOrder::from_unit(&parsed.unit).unwrap();

    collect(&parsed.unit, &order)
}

fn origins(member: &MemberChains) -> Vec<(LayerPos, DeclOrigin)> {
    member
        .decls
        .iter()
        .map(|d| (d.pos, d.origin.clone()))
        .collect()
}

fn layer(s: &str) -> Layer {
    Layer::parse(s).unwrap()
}

#[test]
fn orders_overrides_by_layer_not_declaration() {
    let collected = sut(
        r#"
        [assembly: LayerOrder("A", "B")]
        class Foo
        {
            [Override(Run, "B")] void RunB() { link(Run, base)(); }
            void Run() { }
            [Override(Run, "A")] void RunA() { link(Run, base)(); }
        }
        "#,
    );

    assert_eq!(Vec::<LinkError>::new(), collected.errors);
    assert_eq!(1, collected.members.len());

    let member = &collected.members[0];
    assert_eq!("Run", member.name);
    assert_eq!(MemberKind::Method, member.kind);
    assert_eq!(0, member.placement);

    let got = origins(member);
    assert_eq!(DeclOrigin::Source, got[0].1);
    assert_eq!(DeclOrigin::Override(layer("A")), got[1].1);
    assert_eq!(DeclOrigin::Override(layer("B")), got[2].1);
    assert!(got[0].0 < got[1].0 && got[1].0 < got[2].0);

    assert_eq!(1, member.chains.len());
    assert_eq!(
        vec![DeclId::new(0), DeclId::new(1), DeclId::new(2)],
        member.chains[0].elems
    );

    assert_eq!(
        vec![PlanItem::Linked(member.id)],
        collected.classes[0].items
    );
}

#[test]
fn chain_is_independent_of_declaration_order() {
    let a = sut(
        r#"[assembly: LayerOrder("A", "B")]
        class Foo {
            void Run() { }
            [Override(Run, "A")] void RunA() { }
            [Override(Run, "B")] void RunB() { }
        }"#,
    );
    let b = sut(
        r#"[assembly: LayerOrder("A", "B")]
        class Foo {
            [Override(Run, "B")] void RunB() { }
            void Run() { }
            [Override(Run, "A")] void RunA() { }
        }"#,
    );

    assert_eq!(origins(&a.members[0]), origins(&b.members[0]));
}

#[test]
fn property_accessors_have_separate_chains() {
    let collected = sut(
        r#"
        [assembly: LayerOrder("A", "B")]
        class Foo
        {
            int P { get { return 1; } set { } }
            [Override(P, "A")] int PA { get { return link(P, base); } }
            [Override(P, "B")] int PB { get { return 2; } set { } }
        }
        "#,
    );

    let member = &collected.members[0];
    let get = member.chain(AccessorKind::Get).unwrap();
    let set = member.chain(AccessorKind::Set).unwrap();

    assert_eq!(3, get.elems.len());
    assert_eq!(vec![DeclId::new(0), DeclId::new(2)], set.elems);
    assert!(member.is_final(DeclId::new(2), AccessorKind::Get));
    assert!(!member.is_final(DeclId::new(1), AccessorKind::Get));
}

#[test]
fn inherited_member_is_opaque_first_element() {
    let collected = sut(
        r#"
        [assembly: LayerOrder("A")]
        class Base { virtual void Run() { } }
        class Foo : Base
        {
            [Override(Run, "A")] override void RunA() { link(Run, base)(); }
        }
        "#,
    );

    assert_eq!(Vec::<LinkError>::new(), collected.errors);

    let member = &collected.members[0];
    assert_eq!(1, member.class);
    assert_eq!(
        DeclOrigin::Inherited {
            class: "Base".into()
        },
        member.decls[0].origin
    );
    assert_eq!(None, member.decls[0].index);
    assert_eq!(0, member.placement);

    // The base class itself is untouched.
    assert_eq!(vec![PlanItem::Keep(0)], collected.classes[0].items);
}

#[test]
fn introduction_is_first_element_without_source() {
    let collected = sut(
        r#"
        [assembly: LayerOrder("A", "B")]
        class Foo
        {
            int x;
            [Override(Hello, "B")] void HelloB() { link(Hello, base)(); }
            [Introduce("A")] void Hello() { }
        }
        "#,
    );

    let member = &collected.members[0];
    assert_eq!(DeclOrigin::Introduced(layer("A")), member.decls[0].origin);
    assert_eq!(DeclOrigin::Override(layer("B")), member.decls[1].origin);
    assert_eq!(1, member.placement);

    assert_eq!(
        vec![PlanItem::Keep(0), PlanItem::Linked(member.id)],
        collected.classes[0].items
    );
}

#[test]
fn reads_linker_directives() {
    let collected = sut(
        r#"
        [assembly: LayerOrder("A")]
        class Foo
        {
            [NotInlineable] void Run() { }
            [Override(Run, "A"), NotDiscardable] void RunA() { }
        }
        "#,
    );

    let decls = &collected.members[0].decls;
    assert!(decls[0].flags.not_inlineable);
    assert!(!decls[0].flags.not_discardable);
    assert!(decls[1].flags.not_discardable);
}

#[test]
fn unknown_layer_keeps_source_as_written() {
    let collected = sut(
        r#"
        [assembly: LayerOrder("A")]
        class Foo
        {
            void Run() { }
            [Override(Run, "Z")] void RunZ() { }
        }
        "#,
    );

    assert!(collected.members.is_empty());
    assert!(matches!(
        collected.errors.as_slice(),
        [LinkError::UnknownLayer(name, _)] if name == "Z"
    ));
    assert_eq!(vec![PlanItem::Keep(0)], collected.classes[0].items);
}

#[test]
fn duplicate_layer_is_error() {
    let collected = sut(
        r#"
        [assembly: LayerOrder("A")]
        class Foo
        {
            void Run() { }
            [Override(Run, "A")] void RunA() { }
            [Override(Run, "A")] void RunA2() { }
        }
        "#,
    );

    assert!(matches!(
        collected.errors.as_slice(),
        [LinkError::DuplicateLayer { layer, .. }] if layer == "A"
    ));
}

#[test]
fn layer_listed_twice_fails_only_its_members() {
    let collected = sut(
        r#"
        [assembly: LayerOrder("A", "B", "A")]
        class Foo
        {
            void Run() { }
            [Override(Run, "A")] void RunA() { }
            void Walk() { }
            [Override(Walk, "B")] void WalkB() { }
        }
        "#,
    );

    assert!(matches!(
        collected.errors.as_slice(),
        [LinkError::AmbiguousLayer(name, _)] if name == "A"
    ));
    assert_eq!(1, collected.members.len());
    assert_eq!("Walk", collected.members[0].name);
}

#[test]
fn override_without_target() {
    let collected = sut(
        r#"
        [assembly: LayerOrder("A")]
        class Foo { [Override(Nope, "A")] void NopeA() { } }
        "#,
    );

    assert!(matches!(
        collected.errors.as_slice(),
        [LinkError::OverrideWithoutTarget(name, _)] if name == "Nope"
    ));
    assert!(collected.classes[0].items.is_empty());
}

#[test]
fn shape_mismatches() {
    let collected = sut(
        r#"
        [assembly: LayerOrder("A")]
        class Foo
        {
            void Run(int x) { }
            [Override(Run, "A")] void RunA(ref int x) { }

            int P { get { return 1; } }
            [Override(P, "A")] int PA { get { return 1; } set { } }

            event Handler E { add { } remove { } }
            [Override(E, "A")] event Handler EA { add { } }

            int Q { get { return 1; } }
            [Override(Q, "A")] void QA() { }
        }
        "#,
    );

    let errors = &collected.errors;
    assert_eq!(4, errors.len(), "{errors:?}");
    assert!(matches!(errors[0], LinkError::ShapeMismatch { ref member, .. } if member == "Run"));
    assert!(matches!(
        errors[1],
        LinkError::MissingAccessor { kind: AccessorKind::Set, .. }
    ));
    assert!(matches!(errors[2], LinkError::IncompleteEventOverride(..)));
    assert!(matches!(errors[3], LinkError::ShapeMismatch { ref member, .. } if member == "Q"));
}

#[test]
fn ambiguous_and_conflicting_targets() {
    let collected = sut(
        r#"
        [assembly: LayerOrder("A")]
        class Foo
        {
            void Run() { }
            void Run(int x) { }
            [Override(Run, "A")] void RunA() { }

            void Walk() { }
            [Introduce("A")] void Walk() { }
        }
        "#,
    );

    assert!(matches!(
        collected.errors[0],
        LinkError::AmbiguousTarget { ref decls, .. } if decls.len() == 2
    ));
    assert!(matches!(
        collected.errors[1],
        LinkError::IntroducedMemberExists { .. }
    ));

    // Sources are kept as written;
    //   aspect declarations are dropped.
    assert_eq!(
        vec![PlanItem::Keep(0), PlanItem::Keep(1), PlanItem::Keep(3)],
        collected.classes[0].items
    );
}

#[test]
fn malformed_weaving_attributes() {
    let collected = sut(
        r#"
        [assembly: LayerOrder("A")]
        class Foo
        {
            [Override(Run)] void R1() { }
            [Override(Run, "A"), Introduce("A")] void R2() { }
            [Introduce(5)] void R3() { }
            [Override(Run, "A")] int field;
            void Run() { }
        }
        "#,
    );

    assert_eq!(4, collected.errors.len(), "{:?}", collected.errors);
    assert!(collected
        .errors
        .iter()
        .all(|e| matches!(e, LinkError::InvalidWeavingAttribute(_))));
}

#[test]
fn link_in_untouched_member_is_reported() {
    let collected = sut(
        r#"
        class Foo { void Run() { link(Run, base)(); } }
        "#,
    );

    assert!(matches!(
        collected.errors.as_slice(),
        [LinkError::LinkOutsideOverride(_)]
    ));
    assert_eq!(vec![PlanItem::Keep(0)], collected.classes[0].items);
}

#[test]
fn programmatic_push() {
    let parsed = parse(
        DUMMY_CONTEXT,
        r#"class Foo { void Run() { } void RunA() { link(Run, base)(); } }"#,
    )
    .unwrap();
    let order = LayerOrder::new(vec![layer("A")]).unwrap();
    let class = &parsed.unit.classes[0];

    let key = MemberKey {
        class: 0,
        class_name: "Foo".into(),
        name: "Run".into(),
    };

    let mut sut = Collector::new(&order);
    sut.push_source(key.clone(), 0, class.members[0].clone());
    sut.push(
        key,
        Transformation {
            role: Role::Override,
            layer: layer("A"),
            layer_span: class.members[1].span(),
            member: class.members[1].clone(),
            index: None,
        },
    );

    let (members, errors) = sut.finish();

    assert!(errors.is_empty());
    assert_eq!(2, members[0].decls.len());
    assert_eq!(DeclOrigin::Override(layer("A")), members[0].decls[1].origin);
}

#[test]
fn class_scope_includes_base_members() {
    let collected = sut(
        r#"
        class Base { static int Count; int x; }
        class Foo : Base { void Run() { } }
        "#,
    );

    let scope = &collected.classes[1].scope;
    assert_eq!("Foo", scope.name);
    assert_eq!(Some(true), scope.member_is_static("Count"));
    assert_eq!(Some(false), scope.member_is_static("x"));
    assert_eq!(Some(false), scope.member_is_static("Run"));
    assert_eq!(None, scope.member_is_static("y"));
}

#[test]
fn recognizes_weaving_attributes() {
    assert!(is_weaving_attr("Override"));
    assert!(is_weaving_attr("NotDiscardable"));
    assert!(!is_weaving_attr("Obsolete"));
}
