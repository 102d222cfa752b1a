// Cross-voice alignment within a part: gap padding against the part's
// running position, the measure-length table, trailing barlines, backup,
// and the hard-error/warning split of the bookkeeping operations.

use msr_engine::{
    duration, BarlineKind, ElementId, EngineSettings, MeasureError, MeasureRepeatContext, Note,
    Pitch, Score, VoiceKind, WholeNotes,
};

/// One part, one staff, two regular voices
fn make_two_voice_score() -> Score {
    let mut score = Score::new(EngineSettings::default());
    let part = score.create_part("P1", "Piano");
    part.create_staff(1);
    part.create_voice(1, 1, VoiceKind::Regular).unwrap();
    part.create_voice(1, 2, VoiceKind::Regular).unwrap();
    score
}

fn quarter() -> Note {
    Note::pitched(Pitch::new(0, 0, 4), WholeNotes::new(1, 4))
}

#[test]
fn test_gap_against_part_position_is_padded_with_a_skip() {
    let mut score = make_two_voice_score();
    let part = score.part_mut("P1").unwrap();
    part.create_measure("1");

    // voice 1 advances the part position by two quarters
    {
        let voice = part.voice_mut(1, 1).unwrap();
        voice.append_note_or_padding(quarter()).unwrap();
        voice.append_note_or_padding(quarter()).unwrap();
    }
    part.advance_current_position_in_measure(WholeNotes::new(1, 2));

    // voice 2 starts at the part position: the gap becomes a skip
    let position = part.current_position_in_measure();
    {
        let voice = part.voice_mut(1, 2).unwrap();
        voice.append_note(quarter(), position).unwrap();
    }

    let voice2 = score.part("P1").unwrap().voice(1, 2).unwrap();
    let measure = voice2.measures().next().unwrap();
    assert_eq!(measure.elements().len(), 2);
    assert!(measure.elements()[0].is_skip());
    assert_eq!(
        measure.elements()[0].sounding_whole_notes(),
        WholeNotes::new(1, 2)
    );
    assert_eq!(
        measure.elements()[1].position_in_measure,
        WholeNotes::new(1, 2)
    );
    assert_eq!(measure.current_whole_notes(), WholeNotes::new(3, 4));
}

#[test]
fn test_short_voice_is_padded_to_the_registered_length() {
    // voice 1 fills 4/4, voice 2 only 3/4 and closes with a barline;
    // finalization pads voice 2 to the table length, barline stays last
    let mut score = make_two_voice_score();
    let part = score.part_mut("P1").unwrap();
    part.create_measure("1");
    {
        let voice = part.voice_mut(1, 1).unwrap();
        for _ in 0..4 {
            voice.append_note_or_padding(quarter()).unwrap();
        }
    }
    {
        let voice = part.voice_mut(1, 2).unwrap();
        for _ in 0..3 {
            voice.append_note_or_padding(quarter()).unwrap();
        }
        voice.append_barline(BarlineKind::Final).unwrap();
    }
    part.finalize_current_measures(MeasureRepeatContext::None)
        .unwrap();

    let part = score.part("P1").unwrap();
    assert_eq!(part.measure_table().get(1), Some(WholeNotes::new(1, 1)));

    let measure = part.voice(1, 2).unwrap().measures().next().unwrap();
    assert_eq!(measure.current_whole_notes(), WholeNotes::new(1, 1));
    let last = measure.elements().last().unwrap();
    assert!(last.is_barline(), "barline must remain the last element");
    // the padding skip sits right before it
    let second_to_last = &measure.elements()[measure.elements().len() - 2];
    assert!(second_to_last.is_skip());
    assert_eq!(
        second_to_last.sounding_whole_notes(),
        WholeNotes::new(1, 4)
    );
}

#[test]
fn test_backup_pads_toward_full_measure() {
    let mut score = make_two_voice_score();
    let part = score.part_mut("P1").unwrap();
    part.create_measure("1");

    let voice = part.voice_mut(1, 1).unwrap();
    voice.append_note_or_padding(quarter()).unwrap();
    // a <backup> of one quarter from the measure end
    voice
        .backup_by_whole_notes_step_length(WholeNotes::new(1, 4))
        .unwrap();

    let measure = score
        .part("P1")
        .unwrap()
        .voice(1, 1)
        .unwrap()
        .measures()
        .next()
        .unwrap();
    assert_eq!(measure.current_whole_notes(), WholeNotes::new(3, 4));
}

#[test]
fn test_removing_an_unknown_note_is_a_hard_error() {
    let mut score = make_two_voice_score();
    let part = score.part_mut("P1").unwrap();
    part.create_measure("1");

    let voice = part.voice_mut(1, 1).unwrap();
    voice.append_note_or_padding(quarter()).unwrap();

    let measure = voice.current_measure().unwrap();
    let elements_before = measure.elements().len();
    let duration_before = measure.current_whole_notes();

    let result = measure.remove_note(ElementId(4242));
    assert!(matches!(
        result,
        Err(MeasureError::ElementNotFound { .. })
    ));
    // nothing was mutated
    assert_eq!(measure.elements().len(), elements_before);
    assert_eq!(measure.current_whole_notes(), duration_before);
}

#[test]
fn test_backward_pad_warns_and_leaves_state_alone() {
    let mut score = make_two_voice_score();
    let part = score.part_mut("P1").unwrap();
    part.create_measure("1");

    let voice = part.voice_mut(1, 1).unwrap();
    voice.append_note_or_padding(quarter()).unwrap();
    voice.append_note_or_padding(quarter()).unwrap();

    // target strictly behind the running position
    voice
        .pad_up_to_position_in_measure(WholeNotes::new(1, 4))
        .unwrap();

    let measure = voice.current_measure().unwrap();
    assert_eq!(measure.current_whole_notes(), WholeNotes::new(1, 2));
    assert_eq!(measure.elements().len(), 2);
}

#[test]
fn test_removal_decrements_by_the_removed_duration() {
    let mut score = make_two_voice_score();
    let part = score.part_mut("P1").unwrap();
    part.create_measure("1");

    let voice = part.voice_mut(1, 1).unwrap();
    let half = voice
        .append_note_or_padding(Note::pitched(Pitch::new(4, 0, 4), WholeNotes::new(1, 2)))
        .unwrap();
    voice.append_note_or_padding(quarter()).unwrap();

    let measure = voice.current_measure().unwrap();
    assert_eq!(measure.current_whole_notes(), WholeNotes::new(3, 4));

    // removing the half note, which is not the most recent element
    measure.remove_note(half).unwrap();
    assert_eq!(measure.current_whole_notes(), WholeNotes::new(1, 4));
}

#[test]
fn test_senza_misura_measure_never_fills_up() {
    let mut score = Score::new(EngineSettings::default());
    {
        let part = score.create_part("P1", "Solo");
        part.create_staff(1);
        part.create_voice(1, 1, VoiceKind::Regular).unwrap();
        part.create_measure("1");
    }
    let part = score.part_mut("P1").unwrap();
    {
        let voice = part.voice_mut(1, 1).unwrap();
        voice
            .append_time(msr_engine::TimeSignature::senza_misura())
            .unwrap();
        for _ in 0..9 {
            voice.append_note_or_padding(quarter()).unwrap();
        }
    }
    part.finalize_current_measures(MeasureRepeatContext::None)
        .unwrap();

    let measure = score
        .part("P1")
        .unwrap()
        .voice(1, 1)
        .unwrap()
        .measures()
        .next()
        .unwrap();
    assert_eq!(measure.kind(), msr_engine::MeasureKind::Cadenza);
    assert_eq!(measure.current_whole_notes(), WholeNotes::new(9, 4));
}

#[test]
fn test_score_dump_includes_finalized_measures() {
    let mut score = make_two_voice_score();
    let part = score.part_mut("P1").unwrap();
    part.create_measure("1");
    for voice_number in [1, 2] {
        let voice = part.voice_mut(1, voice_number).unwrap();
        for _ in 0..4 {
            voice.append_note_or_padding(quarter()).unwrap();
        }
    }
    part.finalize_current_measures(MeasureRepeatContext::None)
        .unwrap();

    let json = score.to_json().expect("score should serialize");
    assert!(json.contains("Regular"));
    assert!(json.contains("\"P1\""));
}

#[test]
fn test_zero_part_delta_appends_without_padding() {
    let mut score = make_two_voice_score();
    let part = score.part_mut("P1").unwrap();
    part.create_measure("1");

    let voice = part.voice_mut(1, 1).unwrap();
    voice.append_note(quarter(), duration::zero()).unwrap();
    voice
        .append_note(quarter(), WholeNotes::new(1, 4))
        .unwrap();

    let measure = voice.current_measure().unwrap();
    assert_eq!(measure.elements().len(), 2);
    assert!(measure.elements().iter().all(|e| !e.is_skip()));
}
